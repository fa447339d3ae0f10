//! Staged content pipeline: wire types, stage machine, presenter and controller.

pub mod controller;
pub mod presenter;
pub mod service;
pub mod stage;
pub mod types;
pub mod view;

pub use controller::{Pacing, PipelineController, RunOutcome, StageSink};
pub use service::{GenerationService, HttpGenerationService};
pub use stage::{StageId, StageStatus};
pub use types::{GeneratedContent, Mcq, PipelineRequest, PipelineResponse, ReviewVerdict};
pub use view::{PipelineEvent, PipelineView, StampedEvent};
