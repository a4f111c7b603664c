//! Core domain types for the Jobsift ingestion pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// RawMessage
// ---------------------------------------------------------------------------

/// A single message lifted out of an exported chat document.
///
/// Ephemeral: produced by the extractor, consumed once by the structuring
/// engine. The raw timestamp is always kept; `timestamp_iso` is only set when
/// normalization succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Visible message body, whitespace-collapsed.
    pub text: String,
    /// Timestamp exactly as it appeared in the document header.
    pub timestamp_raw: String,
    /// ISO-8601 rendering of the timestamp, when it could be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_iso: Option<String>,
}

impl RawMessage {
    /// The timestamp to carry forward: normalized if available, raw otherwise.
    pub fn timestamp(&self) -> &str {
        self.timestamp_iso.as_deref().unwrap_or(&self.timestamp_raw)
    }
}

// ---------------------------------------------------------------------------
// JobCandidate
// ---------------------------------------------------------------------------

/// A provisionally structured job posting returned by the structuring engine.
///
/// Only built for provider responses that passed the acceptance gate:
/// `valid == true` with non-empty role and company_name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub role: String,
    pub company_name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// PostId
// ---------------------------------------------------------------------------

/// Deterministic content identifier for a job record.
///
/// Derived from the normalized (company_name, role, location) tuple — never
/// from a timestamp — so reposts of the same posting hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    /// Derive the identifier for a (company, role, location) tuple.
    pub fn derive(company_name: &str, role: &str, location: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity_key(company_name, role, location).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an identifier read back from storage.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized grouping key for a (company, role, location) tuple.
///
/// Fields are trimmed and lowercased, then joined with a unit separator so
/// field boundaries cannot collide. The dedup pass groups stored records by
/// this same key.
pub fn identity_key(company_name: &str, role: &str, location: &str) -> String {
    format!(
        "{}\u{1f}{}\u{1f}{}",
        normalize_field(company_name),
        normalize_field(role),
        normalize_field(location)
    )
}

/// Trim and lowercase a tuple field for identity purposes.
pub fn normalize_field(s: &str) -> String {
    s.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// A persisted job posting. Immutable once written; there is no update path.
///
/// `date_posted` keeps whatever timestamp the source message carried (ISO when
/// normalization succeeded, raw otherwise), so it is stored as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub post_id: PostId,
    pub role: String,
    pub company_name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the source the message came from.
    pub source: String,
    /// When the posting was published, per the source message.
    pub date_posted: String,
    /// When this run extracted the message (ISO-8601).
    pub extracted_at: String,
    /// Set by the database on insert; None on records not yet stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl JobRecord {
    /// Promote an accepted candidate to a record ready for insertion.
    pub fn from_candidate(
        candidate: &JobCandidate,
        source: &str,
        date_posted: impl Into<String>,
        extracted_at: impl Into<String>,
    ) -> Self {
        Self {
            post_id: PostId::derive(
                &candidate.company_name,
                &candidate.role,
                &candidate.location,
            ),
            role: candidate.role.clone(),
            company_name: candidate.company_name.clone(),
            location: candidate.location.clone(),
            experience_required: candidate.experience_required.clone(),
            job_type: candidate.job_type.clone(),
            application_link: candidate.application_link.clone(),
            description: candidate.description.clone(),
            source: source.to_string(),
            date_posted: date_posted.into(),
            extracted_at: extracted_at.into(),
            created_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DuplicateLink
// ---------------------------------------------------------------------------

/// A link between two stored records that represent the same posting.
///
/// Produced only by the batch dedup pass; append-only, one link per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateLink {
    pub original_post_id: PostId,
    pub duplicate_post_id: PostId,
    pub similarity_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_is_deterministic() {
        let a = PostId::derive("Acme Corp", "Python Developer", "Bangalore");
        let b = PostId::derive("Acme Corp", "Python Developer", "Bangalore");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64); // SHA-256 hex
    }

    #[test]
    fn post_id_normalizes_case_and_whitespace() {
        let a = PostId::derive("Acme Corp", "Python Developer", "Bangalore");
        let b = PostId::derive("  acme corp ", "PYTHON DEVELOPER", " bangalore");
        assert_eq!(a, b);
    }

    #[test]
    fn post_id_ignores_everything_but_the_tuple() {
        // Same tuple from messages with different timestamps/descriptions
        // must collide — that is the whole point of the content hash.
        let a = PostId::derive("Acme", "Dev", "Remote");
        let b = PostId::derive("Acme", "Dev", "Remote");
        assert_eq!(a, b);

        let c = PostId::derive("Acme", "Dev", "Pune");
        assert_ne!(a, c);
    }

    #[test]
    fn identity_key_separates_field_boundaries() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(identity_key("ab", "c", "x"), identity_key("a", "bc", "x"));
    }

    #[test]
    fn record_from_candidate_derives_post_id() {
        let candidate = JobCandidate {
            role: "Python Developer".into(),
            company_name: "Acme Corp".into(),
            location: "Bangalore".into(),
            experience_required: Some("2-3 yrs".into()),
            job_type: Some("Remote".into()),
            application_link: Some("jobs@acme.com".into()),
            description: None,
        };

        let record = JobRecord::from_candidate(
            &candidate,
            "Test Channel",
            "2024-06-12T14:32:00",
            "2024-06-12T15:00:00",
        );
        assert_eq!(
            record.post_id,
            PostId::derive("Acme Corp", "Python Developer", "Bangalore")
        );
        assert_eq!(record.source, "Test Channel");
        assert!(record.created_at.is_none());
    }

    #[test]
    fn raw_message_prefers_iso_timestamp() {
        let msg = RawMessage {
            text: "hiring".into(),
            timestamp_raw: "12/06/2024, 2:45 PM".into(),
            timestamp_iso: Some("2024-12-06T14:45:00".into()),
        };
        assert_eq!(msg.timestamp(), "2024-12-06T14:45:00");

        let unparsed = RawMessage {
            text: "hiring".into(),
            timestamp_raw: "yesterday evening".into(),
            timestamp_iso: None,
        };
        assert_eq!(unparsed.timestamp(), "yesterday evening");
    }

    #[test]
    fn candidate_serde_roundtrip() {
        let json = r#"{"role":"Dev","company_name":"Acme","location":"Remote"}"#;
        let candidate: JobCandidate = serde_json::from_str(json).expect("deserialize");
        assert_eq!(candidate.role, "Dev");
        assert!(candidate.experience_required.is_none());

        let out = serde_json::to_string(&candidate).expect("serialize");
        assert!(!out.contains("experience_required"));
    }
}
