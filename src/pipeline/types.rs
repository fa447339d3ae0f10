//! Wire types for the generation endpoint.
//!
//! [`PipelineRequest`] is built from user input and validated before any
//! network activity. [`PipelineResponse`] is the single complete body the
//! server returns; the controller stages its display over time.

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Message surfaced when the grade or topic is missing.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";

/// Validated request payload: `{ "grade": 5, "topic": "Fractions" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRequest {
    grade: u32,
    topic: String,
}

impl PipelineRequest {
    /// Validate raw form input.
    ///
    /// The grade must be a positive integer and the topic must be non-empty
    /// after trimming. The stored topic is the trimmed text.
    pub fn new(grade: i64, topic: &str) -> Result<Self, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() || grade == 0 {
            return Err(PipelineError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        }
        let grade = u32::try_from(grade).map_err(|_| {
            PipelineError::Validation(format!("Grade must be a positive integer, got {}", grade))
        })?;
        Ok(Self {
            grade,
            topic: topic.to_string(),
        })
    }

    pub fn grade(&self) -> u32 {
        self.grade
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// A multiple choice question. Option labels are derived from position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl Mcq {
    /// Whether the answer text matches one of the options.
    ///
    /// Informational only; a mismatch is displayed as-is.
    pub fn answer_in_options(&self) -> bool {
        self.options.iter().any(|o| o == &self.answer)
    }
}

/// Explanation plus question set, shared by the generator and final outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub explanation: String,
    pub mcqs: Vec<Mcq>,
}

/// Reviewer verdict, closed at the boundary.
///
/// Only the exact wire token `"pass"` maps to [`ReviewVerdict::Pass`]. Every
/// other value, recognised or not, is treated as needing revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ReviewVerdict {
    Pass,
    NeedsRevision,
}

impl ReviewVerdict {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "pass" => Self::Pass,
            "fail" => Self::NeedsRevision,
            other => {
                tracing::warn!(
                    status = other,
                    "unrecognised reviewer status, treating as needs revision"
                );
                Self::NeedsRevision
            }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl From<String> for ReviewVerdict {
    fn from(status: String) -> Self {
        Self::from_wire(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerFeedback {
    pub status: ReviewVerdict,
    /// Notes are only meaningful when the verdict is not a pass.
    #[serde(default)]
    pub feedback: Vec<String>,
}

/// Complete server result for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub generator_output: GeneratedContent,
    pub reviewer_feedback: ReviewerFeedback,
    pub refinement_occurred: bool,
    pub final_output: GeneratedContent,
}

impl PipelineResponse {
    /// Parse a success body, checking the structure the display relies on.
    pub fn from_body(body: &str) -> Result<Self, PipelineError> {
        let response: Self = serde_json::from_str(body).map_err(|e| {
            tracing::debug!(error = %e, "response body did not match the pipeline schema");
            PipelineError::Format(e.to_string())
        })?;
        response.check_options()?;
        Ok(response)
    }

    fn check_options(&self) -> Result<(), PipelineError> {
        let outputs = [
            ("generator_output", &self.generator_output),
            ("final_output", &self.final_output),
        ];
        for (field, content) in outputs {
            if let Some(idx) = content.mcqs.iter().position(|m| m.options.is_empty()) {
                return Err(PipelineError::Format(format!(
                    "{}.mcqs[{}] has no options",
                    field, idx
                )));
            }
            for (idx, mcq) in content.mcqs.iter().enumerate() {
                if !mcq.answer_in_options() {
                    tracing::warn!(output = field, idx, answer = %mcq.answer, "answer does not match any option");
                }
            }
        }
        Ok(())
    }
}

/// Failure body: `{ "error": "rate limited" }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
