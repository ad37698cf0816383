//! Remote scoring provider client.
//!
//! The provider receives the three photos as base64 plus the intake answers
//! and returns a loosely-typed JSON object, which `normalize` turns into an
//! `AnalysisResult`. Any failure here is recoverable: the orchestrator falls
//! back to the local estimator.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Scoring provider not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Scoring provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not parse provider response: {0}")]
    ResponseParsing(String),

    #[error("Provider response is not a JSON object")]
    Malformed,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

// ──────────────────────────────────────────────
// Payload
// ──────────────────────────────────────────────

/// Outbound body: `{ frontB64, leftB64, rightB64, meta }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringPayload {
    pub front_b64: String,
    pub left_b64: String,
    pub right_b64: String,
    /// Intake answers, passed through untouched.
    pub meta: Value,
}

impl ScoringPayload {
    pub fn encode(front: &[u8], left: &[u8], right: &[u8], meta: Value) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            front_b64: engine.encode(front),
            left_b64: engine.encode(left),
            right_b64: engine.encode(right),
            meta,
        }
    }

    /// Total encoded size, for logging.
    pub fn encoded_len(&self) -> usize {
        self.front_b64.len() + self.left_b64.len() + self.right_b64.len()
    }
}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Something that can score a photo set remotely.
#[async_trait]
pub trait RemoteScorer: Send + Sync {
    /// Provider label for logs.
    fn provider(&self) -> &str;

    /// Submit the payload. `Ok` carries the raw provider object.
    async fn score(&self, payload: &ScoringPayload) -> Result<Value, RemoteError>;
}

// ──────────────────────────────────────────────
// HttpRemoteScorer
// ──────────────────────────────────────────────

/// Production scorer: JSON POST to a single endpoint.
pub struct HttpRemoteScorer {
    endpoint: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpRemoteScorer {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteScorer for HttpRemoteScorer {
    fn provider(&self) -> &str {
        &self.endpoint
    }

    async fn score(&self, payload: &ScoringPayload) -> Result<Value, RemoteError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RemoteError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    RemoteError::Timeout(self.timeout_secs)
                } else {
                    RemoteError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::ResponseParsing(e.to_string()))?;

        if !parsed.is_object() {
            return Err(RemoteError::Malformed);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            elapsed_ms = %start.elapsed().as_millis(),
            "Remote scoring response received"
        );

        Ok(parsed)
    }
}

// ──────────────────────────────────────────────
// MockRemoteScorer (testing)
// ──────────────────────────────────────────────

/// Scorer returning a fixed response. Records every payload it receives.
pub struct MockRemoteScorer {
    response: Result<Value, fn() -> RemoteError>,
    received: Mutex<Vec<ScoringPayload>>,
}

impl MockRemoteScorer {
    pub fn returning(response: Value) -> Self {
        Self {
            response: Ok(response),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Scorer that always fails with the error built by `make_error`.
    pub fn failing(make_error: fn() -> RemoteError) -> Self {
        Self {
            response: Err(make_error),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_payload(&self) -> Option<ScoringPayload> {
        self.received.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl RemoteScorer for MockRemoteScorer {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn score(&self, payload: &ScoringPayload) -> Result<Value, RemoteError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(payload.clone());
        }
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}
