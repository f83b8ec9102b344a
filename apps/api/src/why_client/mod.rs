//! Why-service client. The single point of entry for upstream WHY calls.
//!
//! No other module may call the why-service directly. Everything goes through
//! `fetch_explanation`, which never fails: upstream errors are logged and
//! replaced by `mock_base_explanation()`, and the base (real or mock) is always
//! passed through the builder before callers see it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::explain::build_explanation;
use crate::models::candidate::Candidate;
use crate::models::explanation::{BaseExplanation, Explanation};
use crate::models::filters::FilterSet;

pub mod mock;

pub use mock::mock_base_explanation;

const WHY_PATH: &str = "/api/recruiter/candidates/why";
const BACKOFF_BASE_MS: u64 = 250;
/// Upper bound on attempts per request, whatever the configuration asks for.
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum WhyClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Request body sent to the why-service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WhyRequest {
    pub candidate_id: String,
    pub job_id: Option<String>,
    pub filters: FilterSet,
}

impl WhyRequest {
    pub fn new(candidate: &Candidate, filters: &FilterSet) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            job_id: None,
            filters: filters.clone(),
        }
    }
}

/// Upstream source of base explanations. Swappable so fallback paths can be tested.
#[async_trait]
pub trait WhyService: Send + Sync {
    async fn explain(&self, request: &WhyRequest) -> Result<BaseExplanation, WhyClientError>;
}

/// Where the base explanation behind an `Explanation` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationOrigin {
    Service,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedExplanation {
    pub explanation: Explanation,
    pub origin: ExplanationOrigin,
}

/// Fetches and enriches an explanation. Never returns an error.
pub async fn fetch_explanation(
    service: &dyn WhyService,
    candidate: &Candidate,
    filters: &FilterSet,
) -> FetchedExplanation {
    let request = WhyRequest::new(candidate, filters);

    let (base, origin) = match service.explain(&request).await {
        Ok(base) => (base, ExplanationOrigin::Service),
        Err(e) => {
            warn!(
                "why-service failed for candidate {}: {e}; using fallback explanation",
                candidate.id
            );
            (mock_base_explanation(), ExplanationOrigin::Fallback)
        }
    };

    FetchedExplanation {
        explanation: build_explanation(candidate, &base, filters),
        origin,
    }
}

/// reqwest-backed `WhyService`.
/// Retries 429 and 5xx with exponential backoff; other failures return immediately.
#[derive(Clone)]
pub struct HttpWhyClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
    max_attempts: u32,
}

impl HttpWhyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WhyClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}{WHY_PATH}", base_url.trim_end_matches('/')),
            token: None,
            max_attempts: 1,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_ATTEMPTS);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl WhyService for HttpWhyClient {
    async fn explain(&self, request: &WhyRequest) -> Result<BaseExplanation, WhyClientError> {
        let mut last_error: Option<WhyClientError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = Duration::from_millis(BACKOFF_BASE_MS * (1 << (attempt - 1)));
                warn!(
                    "why-service attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.post(&self.endpoint).json(request);
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(WhyClientError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = Some(WhyClientError::Http(e));
                    continue;
                }
            };

            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(WhyClientError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                return Err(WhyClientError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let value: Value = serde_json::from_str(&body)?;
            debug!(
                "why-service succeeded for candidate {}",
                request.candidate_id
            );
            return Ok(BaseExplanation::from(value));
        }

        Err(last_error.unwrap_or(WhyClientError::Api {
            status: 0,
            message: "no attempts made".to_string(),
        }))
    }
}
