//! Pipeline controller: turns one generation call into a paced sequence of
//! stage transitions.
//!
//! A run proceeds Reset → Lock → Generate → pause → Review → pause →
//! (Refine → pause) → Finalize → Unlock. Every transition is folded through
//! [`presenter::reduce`] and handed to the [`StageSink`].
//!
//! Only one run may be active. A second [`PipelineController::run`] while one
//! is in flight (including during pacing pauses) is rejected with
//! [`PipelineError::Busy`]. Events are also tagged with the run id and
//! dropped if that run is no longer the active one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::config::PacingSettings;
use crate::errors::{PipelineError, TransitionError};
use crate::pipeline::presenter;
use crate::pipeline::service::GenerationService;
use crate::pipeline::stage::{StageId, StageStatus};
use crate::pipeline::types::{PipelineRequest, PipelineResponse};
use crate::pipeline::view::{PipelineEvent, PipelineView, StageContent, StampedEvent};

/// Receives every applied transition along with the resulting view.
pub trait StageSink: Send + Sync {
    fn on_event(&self, event: &StampedEvent, view: &PipelineView);
}

/// Fixed pacing pauses. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub short: Duration,
    pub long: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            short: Duration::from_millis(500),
            long: Duration::from_millis(1000),
        }
    }
}

impl Pacing {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            short: Duration::ZERO,
            long: Duration::ZERO,
        }
    }

    pub fn from_settings(settings: &PacingSettings) -> Self {
        Self {
            short: Duration::from_millis(settings.short_ms),
            long: Duration::from_millis(settings.long_ms),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Complete {
        run_id: Uuid,
        response: Box<PipelineResponse>,
    },
    /// `run_id` is `None` when the run never started (validation or busy).
    Failed {
        run_id: Option<Uuid>,
        error: PipelineError,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Complete { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

struct ControllerState {
    view: PipelineView,
    active_run: Option<Uuid>,
}

/// Why a run stopped before finalizing.
enum Halt {
    Failed(PipelineError),
    /// The run is no longer the active one.
    Superseded,
}

impl From<PipelineError> for Halt {
    fn from(error: PipelineError) -> Self {
        Self::Failed(error)
    }
}

pub struct PipelineController {
    service: Arc<dyn GenerationService>,
    sink: Arc<dyn StageSink>,
    pacing: Pacing,
    state: Mutex<ControllerState>,
}

impl PipelineController {
    pub fn new(
        service: Arc<dyn GenerationService>,
        sink: Arc<dyn StageSink>,
        pacing: Pacing,
    ) -> Self {
        Self {
            service,
            sink,
            pacing,
            state: Mutex::new(ControllerState {
                view: PipelineView::default(),
                active_run: None,
            }),
        }
    }

    /// Snapshot of the current display state.
    pub fn view(&self) -> PipelineView {
        self.lock_state().view.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().active_run.is_some()
    }

    /// Validate raw input and run the pipeline.
    ///
    /// Invalid input is surfaced on the error display and nothing else
    /// changes: no reset, no lock, no network call. While a run is active
    /// every submission is rejected as busy, valid or not, and the view is
    /// left untouched.
    pub async fn submit(&self, grade: i64, topic: &str) -> RunOutcome {
        match PipelineRequest::new(grade, topic) {
            Ok(request) => self.run(request).await,
            Err(error) => {
                let mut state = self.lock_state();
                if state.active_run.is_some() {
                    tracing::warn!("submission rejected: another run is in progress");
                    return RunOutcome::Failed {
                        run_id: None,
                        error: PipelineError::Busy,
                    };
                }
                tracing::info!(%error, "submission rejected");
                // ErrorShown is accepted from any state.
                let _ = self.apply(
                    &mut state,
                    None,
                    PipelineEvent::ErrorShown {
                        message: error.user_message(),
                    },
                );
                RunOutcome::Failed {
                    run_id: None,
                    error,
                }
            }
        }
    }

    /// Run the pipeline for an already validated request.
    pub async fn run(&self, request: PipelineRequest) -> RunOutcome {
        let guard = match self.begin() {
            Ok(guard) => guard,
            Err(error) => {
                tracing::warn!("run rejected: another run is in progress");
                return RunOutcome::Failed {
                    run_id: None,
                    error,
                };
            }
        };
        let run_id = guard.run_id;
        tracing::info!(%run_id, grade = request.grade(), topic = request.topic(), "pipeline run started");

        let outcome = match self.drive(run_id, &request).await {
            Ok(response) => {
                tracing::info!(
                    %run_id,
                    refined = response.refinement_occurred,
                    "pipeline run complete"
                );
                RunOutcome::Complete {
                    run_id,
                    response: Box::new(response),
                }
            }
            Err(Halt::Failed(error)) => {
                tracing::warn!(%run_id, %error, "pipeline run failed");
                // A superseded run has nothing left to display.
                let _ = self.emit(
                    run_id,
                    PipelineEvent::ErrorShown {
                        message: error.user_message(),
                    },
                );
                RunOutcome::Failed {
                    run_id: Some(run_id),
                    error,
                }
            }
            Err(Halt::Superseded) => {
                tracing::debug!(%run_id, "run superseded, stopping");
                RunOutcome::Failed {
                    run_id: Some(run_id),
                    error: PipelineError::Busy,
                }
            }
        };

        drop(guard);
        outcome
    }

    async fn drive(
        &self,
        run_id: Uuid,
        request: &PipelineRequest,
    ) -> Result<PipelineResponse, Halt> {
        self.emit(run_id, PipelineEvent::Reset)?;
        self.emit(run_id, PipelineEvent::ErrorCleared)?;
        self.emit(run_id, PipelineEvent::PipelineShown)?;
        self.emit(run_id, PipelineEvent::Locked)?;

        self.set_status(run_id, StageId::Generate, StageStatus::InProgress)?;
        let response = self.service.generate(request).await?;

        self.set_status(run_id, StageId::Generate, StageStatus::Complete)?;
        self.show_content(
            run_id,
            StageId::Generate,
            StageContent::Generated(response.generator_output.clone()),
        )?;
        self.pause(self.pacing.short).await;

        self.set_status(run_id, StageId::Review, StageStatus::InProgress)?;
        self.pause(self.pacing.long).await;
        let review = &response.reviewer_feedback;
        self.set_status(run_id, StageId::Review, StageStatus::for_verdict(review.status))?;
        self.show_content(
            run_id,
            StageId::Review,
            StageContent::Review {
                verdict: review.status,
                feedback: review.feedback.clone(),
            },
        )?;
        self.pause(self.pacing.short).await;

        if response.refinement_occurred {
            self.emit(
                run_id,
                PipelineEvent::StageShown {
                    stage: StageId::Refine,
                },
            )?;
            self.set_status(run_id, StageId::Refine, StageStatus::InProgress)?;
            self.pause(self.pacing.long).await;
            self.set_status(run_id, StageId::Refine, StageStatus::Complete)?;
            self.show_content(
                run_id,
                StageId::Refine,
                StageContent::Refined {
                    notes_addressed: review.feedback.len(),
                },
            )?;
            self.pause(self.pacing.short).await;
        }

        self.emit(
            run_id,
            PipelineEvent::FinalRevealed {
                content: response.final_output.clone(),
            },
        )?;
        Ok(response)
    }

    fn set_status(&self, run_id: Uuid, stage: StageId, status: StageStatus) -> Result<(), Halt> {
        tracing::debug!(%run_id, %stage, %status, "stage transition");
        self.emit(run_id, PipelineEvent::StageStatus { stage, status })
    }

    fn show_content(&self, run_id: Uuid, stage: StageId, content: StageContent) -> Result<(), Halt> {
        self.emit(run_id, PipelineEvent::StageRendered { stage, content })?;
        self.emit(run_id, PipelineEvent::StageContentRevealed { stage })
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Apply an event on behalf of `run_id`, dropping it if that run is no
    /// longer active.
    fn emit(&self, run_id: Uuid, event: PipelineEvent) -> Result<(), Halt> {
        let mut state = self.lock_state();
        if state.active_run != Some(run_id) {
            tracing::debug!(%run_id, ?event, "dropping event from inactive run");
            return Err(Halt::Superseded);
        }
        self.apply(&mut state, Some(run_id), event)
            .map_err(|e| Halt::Failed(PipelineError::Transition(e)))
    }

    /// Fold `event` into the view and notify the sink. A rejected event
    /// leaves the view unchanged.
    fn apply(
        &self,
        state: &mut ControllerState,
        run_id: Option<Uuid>,
        event: PipelineEvent,
    ) -> Result<(), TransitionError> {
        match presenter::reduce(&state.view, &event) {
            Ok(next) => {
                state.view = next;
                self.sink
                    .on_event(&StampedEvent::new(run_id, event), &state.view);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, ?event, "presenter rejected transition");
                Err(e)
            }
        }
    }

    fn begin(&self) -> Result<RunGuard<'_>, PipelineError> {
        let mut state = self.lock_state();
        if state.active_run.is_some() {
            return Err(PipelineError::Busy);
        }
        let run_id = Uuid::new_v4();
        state.active_run = Some(run_id);
        state.view = PipelineView {
            run_id: Some(run_id),
            ..state.view.clone()
        };
        Ok(RunGuard {
            controller: self,
            run_id,
        })
    }

    fn finish(&self, run_id: Uuid) {
        let mut state = self.lock_state();
        if state.active_run != Some(run_id) {
            return;
        }
        if std::thread::panicking() {
            // Do not call back into a sink that may be the source of the panic.
            state.view = PipelineView {
                trigger_enabled: true,
                ..state.view.clone()
            };
        } else {
            // Unlocked is accepted from any state.
            let _ = self.apply(&mut state, Some(run_id), PipelineEvent::Unlocked);
        }
        state.active_run = None;
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        // A panicking sink poisons the lock; the state itself stays coherent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Re-enables the trigger when dropped, on every exit path of a run.
struct RunGuard<'a> {
    controller: &'a PipelineController,
    run_id: Uuid,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.controller.finish(self.run_id);
    }
}
