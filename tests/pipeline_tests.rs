//! Controller scenarios against a scripted service, plus the HTTP service
//! against an in-process stub server.

mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use ekalavya::config::ApiSettings;
use ekalavya::errors::{GENERIC_FORMAT_MESSAGE, GENERIC_TRANSPORT_MESSAGE, PipelineError};
use ekalavya::pipeline::presenter::{REVISION_HEADLINE, error_text, render_stage_content};
use ekalavya::pipeline::view::StageContent;
use ekalavya::pipeline::{
    GenerationService, HttpGenerationService, Pacing, PipelineController, PipelineEvent,
    PipelineRequest, PipelineResponse, PipelineView, ReviewVerdict, StageId, StageSink,
    StageStatus, StampedEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(StampedEvent, PipelineView)>>,
}

impl StageSink for RecordingSink {
    fn on_event(&self, event: &StampedEvent, view: &PipelineView) {
        self.records
            .lock()
            .unwrap()
            .push((event.clone(), view.clone()));
    }
}

impl RecordingSink {
    fn events(&self) -> Vec<PipelineEvent> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.event.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn position(&self, wanted: &PipelineEvent) -> Option<usize> {
        self.events().iter().position(|e| e == wanted)
    }

    fn statuses_for(&self, stage: StageId) -> Vec<StageStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::StageStatus { stage: s, status } if s == stage => Some(status),
                _ => None,
            })
            .collect()
    }
}

/// Returns a fixed result. Records how many events the sink had seen when
/// the request went out, and can hold the request until released.
struct ScriptedService {
    result: Result<PipelineResponse, PipelineError>,
    sink: Arc<RecordingSink>,
    calls: AtomicUsize,
    events_at_call: Mutex<Vec<usize>>,
    gate: Option<Notify>,
}

impl ScriptedService {
    fn new(result: Result<PipelineResponse, PipelineError>, sink: Arc<RecordingSink>) -> Self {
        Self {
            result,
            sink,
            calls: AtomicUsize::new(0),
            events_at_call: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, _request: &PipelineRequest) -> Result<PipelineResponse, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events_at_call.lock().unwrap().push(self.sink.len());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

fn response(status: &str, feedback: &[&str], refined: bool) -> PipelineResponse {
    serde_json::from_value(common::pipeline_body(status, feedback, refined)).unwrap()
}

fn setup(
    result: Result<PipelineResponse, PipelineError>,
) -> (PipelineController, Arc<ScriptedService>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let service = Arc::new(ScriptedService::new(result, sink.clone()));
    let controller = PipelineController::new(service.clone(), sink.clone(), Pacing::none());
    (controller, service, sink)
}

fn assert_monotonic(sink: &RecordingSink) {
    for stage in StageId::ALL {
        let seen = sink.statuses_for(stage);
        if let Some(first) = seen.first() {
            assert_eq!(*first, StageStatus::InProgress, "{} skipped in-progress", stage);
        }
        assert!(seen.len() <= 2, "{} changed status {} times", stage, seen.len());
        if let Some(last) = seen.get(1) {
            assert!(last.is_terminal(), "{} reverted to {}", stage, last);
        }
    }
}

// =============================================================================
// Controller scenarios
// =============================================================================

mod controller {
    use super::*;

    #[tokio::test]
    async fn test_pass_without_refinement() {
        let resp = response("pass", &[], false);
        let (ctl, service, sink) = setup(Ok(resp.clone()));

        let outcome = ctl.submit(5, "Fractions").await;
        assert!(outcome.is_success());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        let view = ctl.view();
        assert_eq!(view.stage(StageId::Generate).status, StageStatus::Complete);
        assert_eq!(view.stage(StageId::Review).status, StageStatus::Complete);
        assert_eq!(view.stage(StageId::Review).label, "Passed");
        assert!(!view.stage(StageId::Refine).visible);
        assert!(sink.statuses_for(StageId::Refine).is_empty());
        assert_eq!(view.final_output, Some(resp.final_output));
        assert!(view.trigger_enabled);
        assert!(view.error.is_none());
        assert_monotonic(&sink);
    }

    #[tokio::test]
    async fn test_pass_never_renders_feedback() {
        let (ctl, _service, _sink) = setup(Ok(response("pass", &["ignored"], false)));
        ctl.submit(5, "Fractions").await;

        let review = ctl.view().stage(StageId::Review).clone();
        assert!(review.content_visible);
        let lines = render_stage_content(review.content.as_ref().unwrap());
        assert!(!lines.iter().any(|l| l.contains("ignored")));
        assert!(!lines.iter().any(|l| l == "Feedback:"));
    }

    #[tokio::test]
    async fn test_fail_with_refinement() {
        let resp = response("fail", &["too long", "unclear"], true);
        let (ctl, _service, sink) = setup(Ok(resp.clone()));

        assert!(ctl.submit(5, "Fractions").await.is_success());

        let view = ctl.view();
        let review = view.stage(StageId::Review);
        assert_eq!(review.status, StageStatus::NeedsRevision);
        assert_eq!(review.label, "Needs Revision");
        assert_eq!(
            review.content,
            Some(StageContent::Review {
                verdict: ReviewVerdict::NeedsRevision,
                feedback: vec!["too long".to_string(), "unclear".to_string()],
            })
        );

        let refine = view.stage(StageId::Refine);
        assert!(refine.visible);
        assert!(refine.content_visible);
        assert_eq!(refine.status, StageStatus::Complete);
        assert_eq!(
            sink.statuses_for(StageId::Refine),
            vec![StageStatus::InProgress, StageStatus::Complete]
        );

        let refine_done = sink
            .position(&PipelineEvent::StageStatus {
                stage: StageId::Refine,
                status: StageStatus::Complete,
            })
            .unwrap();
        let final_shown = sink
            .position(&PipelineEvent::FinalRevealed {
                content: resp.final_output.clone(),
            })
            .unwrap();
        assert!(refine_done < final_shown);
        assert_eq!(view.final_output, Some(resp.final_output));
        assert_monotonic(&sink);
    }

    #[tokio::test]
    async fn test_unrecognised_verdict_renders_empty_feedback() {
        let (ctl, _service, _sink) = setup(Ok(response("maybe", &[], false)));
        assert!(ctl.submit(2, "Shapes").await.is_success());

        let review = ctl.view().stage(StageId::Review).clone();
        assert_eq!(review.status, StageStatus::NeedsRevision);
        let lines = render_stage_content(review.content.as_ref().unwrap());
        assert_eq!(lines, vec![REVISION_HEADLINE, "Feedback:"]);
    }

    #[tokio::test]
    async fn test_final_only_after_all_stages_terminal() {
        let (ctl, _service, sink) = setup(Ok(response("fail", &["x"], true)));
        ctl.submit(5, "Fractions").await;

        let records = sink.records.lock().unwrap();
        let (_, before_final) = records
            .iter()
            .rev()
            .find(|(e, _)| !matches!(e.event, PipelineEvent::FinalRevealed { .. } | PipelineEvent::Unlocked))
            .unwrap();
        assert!(before_final.final_output.is_none());
        assert_eq!(before_final.first_unfinished_stage(), None);
        for (event, view) in records.iter() {
            if view.final_output.is_some() {
                assert_eq!(
                    view.first_unfinished_stage(),
                    None,
                    "final visible at {:?}",
                    event.event
                );
            }
        }
    }

    #[tokio::test]
    async fn test_reset_precedes_network_call() {
        let (ctl, service, sink) = setup(Ok(response("fail", &["x"], true)));
        ctl.submit(5, "Fractions").await;
        ctl.submit(6, "Decimals").await;

        let calls = service.events_at_call.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);

        let records = sink.records.lock().unwrap();
        let second_run: Vec<_> = records
            .iter()
            .filter(|(e, _)| e.run_id == records.last().unwrap().0.run_id)
            .collect();
        let (_, after_reset) = second_run
            .iter()
            .find(|(e, _)| e.event == PipelineEvent::Reset)
            .copied()
            .unwrap();
        for stage in &after_reset.stages {
            assert_eq!(stage.status, StageStatus::Pending);
            assert!(!stage.content_visible);
        }
        assert!(!after_reset.stage(StageId::Refine).visible);
        assert!(after_reset.final_output.is_none());

        let reset_index = records
            .iter()
            .position(|(e, _)| e.run_id == second_run[0].0.run_id && e.event == PipelineEvent::Reset)
            .unwrap();
        assert!(reset_index < calls[1]);
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected_before_network() {
        let (ctl, service, sink) = setup(Ok(response("pass", &[], false)));

        let outcome = ctl.submit(5, "   ").await;
        assert!(matches!(outcome.error(), Some(PipelineError::Validation(_))));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            sink.events(),
            vec![PipelineEvent::ErrorShown {
                message: "Please fill in all fields".to_string()
            }]
        );
        let view = ctl.view();
        assert!(view.trigger_enabled);
        assert!(!view.pipeline_visible);
        assert!(view.run_id.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_server_message() {
        let (ctl, _service, sink) =
            setup(Err(PipelineError::transport("rate limited", Some(429))));

        let outcome = ctl.submit(5, "Fractions").await;
        assert!(!outcome.is_success());

        let view = ctl.view();
        assert_eq!(error_text(view.error.as_deref().unwrap()), "Error: rate limited");
        assert!(view.trigger_enabled);
        assert!(
            view.stages
                .iter()
                .all(|s| s.status != StageStatus::Complete)
        );
        assert!(view.final_output.is_none());
        assert_eq!(sink.events().last(), Some(&PipelineEvent::Unlocked));
    }

    #[tokio::test]
    async fn test_format_error_uses_generic_message() {
        let (ctl, _service, _sink) = setup(Err(PipelineError::Format(
            "missing field `final_output`".to_string(),
        )));
        ctl.submit(5, "Fractions").await;
        assert_eq!(ctl.view().error.as_deref(), Some(GENERIC_FORMAT_MESSAGE));
        assert!(ctl.view().trigger_enabled);
    }

    #[tokio::test]
    async fn test_error_cleared_on_next_run() {
        let (ctl, _service, _sink) = setup(Ok(response("pass", &[], false)));
        ctl.submit(5, "").await;
        assert!(ctl.view().error.is_some());
        ctl.submit(5, "Fractions").await;
        assert!(ctl.view().error.is_none());
    }

    #[tokio::test]
    async fn test_second_run_while_busy_is_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(
            ScriptedService::new(Ok(response("pass", &[], false)), sink.clone()).gated(),
        );
        let ctl = PipelineController::new(service.clone(), sink.clone(), Pacing::none());

        let (first, second) = tokio::join!(ctl.submit(5, "Fractions"), async {
            let outcome = ctl.submit(6, "Decimals").await;
            service.release();
            outcome
        });

        assert_eq!(second.error(), Some(&PipelineError::Busy));
        assert!(first.is_success());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        let first_run = match first {
            ekalavya::pipeline::RunOutcome::Complete { run_id, .. } => run_id,
            other => panic!("unexpected outcome {:?}", other),
        };
        let records = sink.records.lock().unwrap();
        assert!(records.iter().all(|(e, _)| e.run_id == Some(first_run)));
        assert!(!ctl.is_running());
    }

    #[tokio::test]
    async fn test_invalid_submission_while_busy_leaves_view_alone() {
        let sink = Arc::new(RecordingSink::default());
        let resp = response("pass", &[], false);
        let service = Arc::new(ScriptedService::new(Ok(resp.clone()), sink.clone()).gated());
        let ctl = PipelineController::new(service.clone(), sink.clone(), Pacing::none());

        let (first, second) = tokio::join!(ctl.submit(5, "Fractions"), async {
            let outcome = ctl.submit(5, "  ").await;
            service.release();
            outcome
        });

        assert!(first.is_success());
        assert_eq!(second.error(), Some(&PipelineError::Busy));

        let view = ctl.view();
        assert_eq!(view.final_output, Some(resp.final_output));
        assert!(view.error.is_none());
        assert!(
            !sink
                .events()
                .iter()
                .any(|e| matches!(e, PipelineEvent::ErrorShown { .. }))
        );
        assert!(sink.records.lock().unwrap().iter().all(|(e, _)| e.run_id.is_some()));
    }

    #[tokio::test]
    async fn test_cancelled_run_unlocks_trigger() {
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(
            ScriptedService::new(Ok(response("pass", &[], false)), sink.clone()).gated(),
        );
        let ctl = PipelineController::new(service.clone(), sink.clone(), Pacing::none());

        tokio::select! {
            biased;
            _ = ctl.submit(5, "Fractions") => panic!("gated run should not finish"),
            _ = tokio::task::yield_now() => {}
        }

        let view = ctl.view();
        assert!(view.trigger_enabled);
        assert!(!ctl.is_running());
        assert_eq!(sink.events().last(), Some(&PipelineEvent::Unlocked));
    }

    #[tokio::test]
    async fn test_paced_run_still_completes() {
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(ScriptedService::new(
            Ok(response("fail", &["x"], true)),
            sink.clone(),
        ));
        let pacing = Pacing {
            short: std::time::Duration::from_millis(1),
            long: std::time::Duration::from_millis(2),
        };
        let ctl = PipelineController::new(service, sink.clone(), pacing);
        assert!(ctl.submit(4, "Weather").await.is_success());
        assert_monotonic(&sink);
    }
}

// =============================================================================
// HTTP service
// =============================================================================

mod http_service {
    use super::*;

    fn service_for(base_url: &str) -> HttpGenerationService {
        HttpGenerationService::new(&ApiSettings {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..ApiSettings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_body_is_parsed() {
        let stub = common::spawn_stub(
            StatusCode::OK,
            common::pipeline_body("fail", &["too long"], true).to_string(),
        )
        .await;

        let request = PipelineRequest::new(5, "Fractions").unwrap();
        let resp = service_for(&stub.base_url).generate(&request).await.unwrap();
        assert!(resp.refinement_occurred);
        assert_eq!(resp.reviewer_feedback.feedback, vec!["too long"]);

        let sent = stub.requests.lock().unwrap().clone();
        assert_eq!(sent, vec![serde_json::json!({"grade": 5, "topic": "Fractions"})]);
    }

    #[tokio::test]
    async fn test_failure_body_message() {
        let stub = common::spawn_stub(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":"rate limited"}"#.to_string(),
        )
        .await;
        let request = PipelineRequest::new(5, "Fractions").unwrap();
        let err = service_for(&stub.base_url).generate(&request).await.unwrap_err();
        assert_eq!(err, PipelineError::transport("rate limited", Some(429)));
    }

    #[tokio::test]
    async fn test_failure_without_error_field() {
        let stub = common::spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, "{}".to_string()).await;
        let request = PipelineRequest::new(5, "Fractions").unwrap();
        let err = service_for(&stub.base_url).generate(&request).await.unwrap_err();
        assert_eq!(err.user_message(), GENERIC_TRANSPORT_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let stub = common::spawn_stub(StatusCode::OK, r#"{"generator_output": {}}"#.to_string()).await;
        let request = PipelineRequest::new(5, "Fractions").unwrap();
        let err = service_for(&stub.base_url).generate(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Format(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = PipelineRequest::new(5, "Fractions").unwrap();
        let err = service_for(&format!("http://{}", addr))
            .generate(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport { status: None, .. }));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let stub = common::spawn_stub(StatusCode::OK, "{}".to_string()).await;
        let health = service_for(&stub.base_url).health().await.unwrap();
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn test_controller_over_http_end_to_end() {
        let stub = common::spawn_stub(
            StatusCode::OK,
            common::pipeline_body("pass", &[], false).to_string(),
        )
        .await;
        let sink = Arc::new(RecordingSink::default());
        let ctl = PipelineController::new(
            Arc::new(service_for(&stub.base_url)),
            sink.clone(),
            Pacing::none(),
        );
        assert!(ctl.submit(5, "Fractions").await.is_success());
        assert_eq!(stub.request_count(), 1);
        assert_eq!(ctl.view().stage(StageId::Review).label, "Passed");
    }
}
