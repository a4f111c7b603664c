//! HTTP client for the Ollama-compatible text-completion provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use jobsift_shared::{JobsiftError, ProviderConfig, Result};

/// Failure modes of a single provider call.
///
/// These never cross the structuring boundary as errors: the engine folds
/// them into [`StructureOutcome::Provider`](crate::StructureOutcome) and the
/// affected message is simply rejected.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request exceeded the configured per-request timeout.
    #[error("provider request timed out after {0}s")]
    Timeout(u64),

    /// The provider could not be reached at all.
    #[error("cannot reach completion provider at {0}")]
    Connection(String),

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {0}")]
    BadStatus(u16),

    /// The provider answered, but not with anything parseable.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

/// Response body from `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Async client for an Ollama-compatible completion server.
///
/// Each call carries the configured request-level timeout; there is no retry.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Build a client from provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| JobsiftError::config(format!("failed to build HTTP client: {e}")))?;

        let mut config = config.clone();
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self { config, client })
    }

    /// The model this client requests.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One completion call. Exactly one outbound request; errors map onto the
    /// [`ProviderError`] taxonomy and the raw completion text is returned as-is.
    pub async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            num_predict: self.config.num_predict,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    /// Reachability precondition, checked once before a run — never per call.
    pub async fn check_ready(&self) -> std::result::Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus(status.as_u16()));
        }
        Ok(())
    }

    fn classify(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout_secs)
        } else if e.is_connect() {
            ProviderError::Connection(self.config.base_url.clone())
        } else {
            ProviderError::Connection(format!("{}: {e}", self.config.base_url))
        }
    }
}
