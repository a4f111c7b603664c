//! Tolerant parsing of provider completions.
//!
//! Completion models wrap their JSON in prose more often than not. Only the
//! span from the first `{` to the last `}` is parsed; everything around it
//! is ignored.

use serde::Deserialize;

use jobsift_shared::JobCandidate;

use crate::client::ProviderError;

/// Shape of the provider's JSON reply. Every field except `valid` is
/// optional — the gate decides what is usable.
#[derive(Debug, Deserialize)]
struct StructuredReply {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    experience_required: Option<String>,
    #[serde(default)]
    job_type: Option<String>,
    #[serde(default)]
    application_link: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a raw completion into a candidate.
///
/// `Err` is a provider failure (no JSON object, broken JSON); `Ok(None)` is a
/// well-formed reply that did not pass the acceptance gate.
pub(crate) fn parse_reply(
    raw: &str,
) -> std::result::Result<Option<JobCandidate>, ProviderError> {
    let span = extract_json_span(raw).ok_or_else(|| {
        ProviderError::MalformedResponse("no JSON object in completion".into())
    })?;

    let reply: StructuredReply = serde_json::from_str(span)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    Ok(accept(reply))
}

/// The span from the first `{` to the last `}`, inclusive.
fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Acceptance gate: `valid` must be true and both role and company_name must
/// be non-empty after trimming. Everything else is optional.
fn accept(reply: StructuredReply) -> Option<JobCandidate> {
    if !reply.valid {
        return None;
    }

    let role = non_empty(reply.role)?;
    let company_name = non_empty(reply.company_name)?;
    let location = non_empty(reply.location).unwrap_or_else(|| "Not specified".to_string());

    Some(JobCandidate {
        role,
        company_name,
        location,
        experience_required: non_empty(reply.experience_required),
        job_type: non_empty(reply.job_type),
        application_link: non_empty(reply.application_link),
        description: non_empty(reply.description),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
