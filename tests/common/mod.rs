//! Shared fixtures: canned response bodies and an in-process stub of the
//! content service.

#![allow(dead_code)]

use axum::Router;
use axum::http::{StatusCode, header};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

pub fn generated(explanation: &str) -> Value {
    json!({
        "explanation": explanation,
        "mcqs": [{
            "question": "What is 1/2 of 8?",
            "options": ["2", "4", "6", "8"],
            "answer": "4"
        }]
    })
}

/// A success body with the given reviewer verdict.
pub fn pipeline_body(status: &str, feedback: &[&str], refined: bool) -> Value {
    json!({
        "generator_output": generated("A fraction is part of a whole."),
        "reviewer_feedback": {"status": status, "feedback": feedback},
        "refinement_occurred": refined,
        "final_output": generated(if refined {
            "A fraction names equal parts of one whole thing."
        } else {
            "A fraction is part of a whole."
        }),
    })
}

/// Running stub server. Requests to the generate route are recorded.
pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl StubServer {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Serve `body` with `status` on `POST /api/generate` and a healthy `/health`.
pub async fn spawn_stub(status: StatusCode, body: String) -> StubServer {
    let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    let app = Router::new()
        .route(
            "/api/generate",
            post(move |axum::Json(req): axum::Json<Value>| {
                let recorded = recorded.clone();
                let body = body.clone();
                async move {
                    recorded.lock().unwrap().push(req);
                    (status, [(header::CONTENT_TYPE, "application/json")], body)
                }
            }),
        )
        .route(
            "/health",
            get(|| async { axum::Json(json!({"status": "healthy"})) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        base_url: format!("http://{}", addr),
        requests,
    }
}
