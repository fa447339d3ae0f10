//! Shared UI icons.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Stage status indicators
pub static PENDING: Emoji<'_, '_> = Emoji("⏳ ", "[..]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");

// Stage headers
pub static GENERATE: Emoji<'_, '_> = Emoji("📝 ", "[G]");
pub static REVIEW: Emoji<'_, '_> = Emoji("🔍 ", "[R]");
pub static REFINE: Emoji<'_, '_> = Emoji("🔄 ", "[F]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
