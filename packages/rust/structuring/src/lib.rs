//! LLM-assisted structuring of free-form messages into job candidates.
//!
//! One outbound completion request per message; the raw completion is parsed
//! tolerantly and passed through an acceptance gate. Every failure mode folds
//! into a [`StructureOutcome`] — nothing here aborts a run.

mod client;
mod parser;
mod prompt;

use tracing::debug;

use jobsift_shared::JobCandidate;

pub use client::{OllamaClient, ProviderError};

/// Terminal outcome of structuring one message.
#[derive(Debug)]
pub enum StructureOutcome {
    /// The provider judged the text a genuine posting and the required
    /// fields survived the gate.
    Candidate(JobCandidate),
    /// Well-formed provider reply, but not a usable posting
    /// (`valid == false` or missing role/company).
    Invalid,
    /// The provider call itself failed; the message is rejected, the run
    /// continues.
    Provider(ProviderError),
}

impl StructureOutcome {
    /// Convenience for tests and tallying.
    pub fn candidate(self) -> Option<JobCandidate> {
        match self {
            Self::Candidate(c) => Some(c),
            _ => None,
        }
    }
}

/// The structuring engine: prompt construction + provider call + gate.
///
/// Cloneable so callers can fan structuring calls out across tasks; the
/// underlying HTTP client is shared.
#[derive(Debug, Clone)]
pub struct JobStructurer {
    client: OllamaClient,
}

impl JobStructurer {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    /// Reachability precondition for a run; checked once, never per call.
    pub async fn check_ready(&self) -> Result<(), ProviderError> {
        self.client.check_ready().await
    }

    /// Structure one message. Exactly one provider request; no retry.
    pub async fn structure(
        &self,
        text: &str,
        timestamp: &str,
        source: &str,
    ) -> StructureOutcome {
        let prompt = prompt::build_prompt(text, timestamp);

        let raw = match self.client.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(source, error = %e, "provider call failed");
                return StructureOutcome::Provider(e);
            }
        };

        match parser::parse_reply(&raw) {
            Ok(Some(candidate)) => {
                debug!(source, role = %candidate.role, company = %candidate.company_name, "candidate accepted");
                StructureOutcome::Candidate(candidate)
            }
            Ok(None) => {
                debug!(source, "reply rejected by acceptance gate");
                StructureOutcome::Invalid
            }
            Err(e) => {
                debug!(source, error = %e, "unusable provider reply");
                StructureOutcome::Provider(e)
            }
        }
    }
}
