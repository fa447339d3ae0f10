//! Typed error hierarchy for the pipeline client.
//!
//! - `PipelineError`: terminates a single run; surfaced on the error display
//! - `TransitionError`: a pipeline event that the view reducer refuses

use thiserror::Error;

use crate::pipeline::stage::{StageId, StageStatus};

/// Fallback when a failure response carries no `error` field.
pub const GENERIC_TRANSPORT_MESSAGE: &str = "API request failed";

/// Message shown when a success body does not match the pipeline schema.
pub const GENERIC_FORMAT_MESSAGE: &str = "Failed to parse server response";

/// Message shown when the display refuses a transition mid-run.
pub const GENERIC_DISPLAY_MESSAGE: &str = "Display update failed";

/// Errors that end a run. None of them are fatal to the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Bad input, rejected before any network activity.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The request could not be completed or the server reported a failure.
    #[error("Request failed: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// A success body missing required structure.
    #[error("Malformed response: {0}")]
    Format(String),

    /// A run is already in progress; the trigger is locked.
    #[error("A pipeline run is already in progress")]
    Busy,

    /// The display refused a transition the run tried to apply.
    #[error("Display transition rejected: {0}")]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    /// Text for the error display, before the `Error: ` prefix is applied.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Transport { message, .. } => message.clone(),
            Self::Format(_) => GENERIC_FORMAT_MESSAGE.to_string(),
            Self::Busy => "A pipeline run is already in progress".to_string(),
            Self::Transition(_) => GENERIC_DISPLAY_MESSAGE.to_string(),
        }
    }

    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }
}

/// A pipeline event the reducer will not apply to the current view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Stage {stage} cannot move from {from} to {to}")]
    InvalidStatus {
        stage: StageId,
        from: StageStatus,
        to: StageStatus,
    },

    #[error("Stage {0} is not shown")]
    StageHidden(StageId),

    #[error("Final output revealed before stage {0} reached a terminal status")]
    FinalBeforeTerminal(StageId),
}
