//! CLI command implementations.
//!
//! | Module        | Commands handled |
//! |---------------|------------------|
//! | `generate`    | `Generate`       |
//! | `interactive` | `Interactive`    |
//! | `health`      | `Health`         |
//! | `config`      | `Config`         |

pub mod config;
pub mod generate;
pub mod health;
pub mod interactive;

pub use config::{cmd_config, load_config};
pub use generate::cmd_generate;
pub use health::cmd_health;
pub use interactive::cmd_interactive;
