//! Run summary counters.

use serde::Serialize;

/// Terminal-state counters for one source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStats {
    /// Source name.
    pub source: String,
    /// Messages fed to the structuring engine.
    pub processed: usize,
    /// Messages the provider structured into accepted candidates.
    pub candidates: usize,
    /// Candidates stored as new records.
    pub inserted: usize,
    /// Candidates whose post_id already existed.
    pub duplicates: usize,
    /// Messages rejected (provider failure, invalid, missing fields).
    pub rejected: usize,
    /// Fetch/extraction failure for this source, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }
}

/// Summary of a full ingestion run. Always emitted, including when some
/// sources failed, so partial results stay visible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Per-source counters, in processing order.
    pub sources: Vec<SourceStats>,
    /// Links created by the batch dedup pass.
    pub duplicate_links: usize,
    /// Records in the database after the run.
    pub total_records: u64,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.sources.iter().map(|s| s.processed).sum()
    }

    pub fn candidates(&self) -> usize {
        self.sources.iter().map(|s| s.candidates).sum()
    }

    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }

    pub fn rejected(&self) -> usize {
        self.sources.iter().map(|s| s.rejected).sum()
    }

    /// Sources that failed to fetch or extract.
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceStats> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}
