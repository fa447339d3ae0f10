//! Network boundary: the generation endpoint.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ApiSettings;
use crate::errors::{GENERIC_TRANSPORT_MESSAGE, PipelineError};
use crate::pipeline::types::{ErrorBody, PipelineRequest, PipelineResponse};

/// Abstraction over the content service for testability.
/// Real implementation: `HttpGenerationService`.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Issue exactly one generation request and parse the complete result.
    async fn generate(&self, request: &PipelineRequest) -> Result<PipelineResponse, PipelineError>;
}

/// Health endpoint reply, e.g. `{"status": "healthy"}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// reqwest-backed client for `POST {base_url}{generate_path}`.
pub struct HttpGenerationService {
    client: reqwest::Client,
    generate_url: String,
    health_url: String,
}

impl HttpGenerationService {
    pub fn new(settings: &ApiSettings) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PipelineError::transport(format!("Failed to build HTTP client: {}", e), None))?;
        Ok(Self {
            client,
            generate_url: join_url(&settings.base_url, &settings.generate_path),
            health_url: join_url(&settings.base_url, &settings.health_path),
        })
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    /// Query the service health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, PipelineError> {
        let resp = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| PipelineError::transport(e.to_string(), None))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::transport(
                format!("Health check returned {}", status),
                Some(status.as_u16()),
            ));
        }
        resp.json::<HealthStatus>()
            .await
            .map_err(|e| PipelineError::Format(e.to_string()))
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn generate(&self, request: &PipelineRequest) -> Result<PipelineResponse, PipelineError> {
        tracing::debug!(url = %self.generate_url, grade = request.grade(), "sending generation request");
        let resp = self
            .client
            .post(&self.generate_url)
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::transport(e.to_string(), None))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::transport(e.to_string(), Some(status.as_u16())))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "generation endpoint reported failure");
            return Err(PipelineError::transport(
                failure_message(&body),
                Some(status.as_u16()),
            ));
        }

        PipelineResponse::from_body(&body)
    }
}

/// Message from a failure body's `error` field, or the generic fallback.
pub fn failure_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_TRANSPORT_MESSAGE.to_string())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
