//! Message sources for an ingestion run.
//!
//! A source either supplies a raw exported document (which goes through the
//! extractor) or a pre-extracted sequence of {text, timestamp} pairs
//! (bypassing it). Sources are tagged variants selected explicitly — never
//! probed at runtime.

use std::path::PathBuf;

use jobsift_shared::{JobsiftError, RawMessage, Result};

/// A registered message source, processed independently within a run.
#[derive(Debug, Clone)]
pub enum Source {
    /// An exported chat document on disk.
    ExportFile { name: String, path: PathBuf },
    /// Messages already extracted by an upstream collaborator.
    Preextracted {
        name: String,
        messages: Vec<RawMessage>,
    },
}

impl Source {
    /// A document-backed source.
    pub fn export_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::ExportFile {
            name: name.into(),
            path: path.into(),
        }
    }

    /// A source from pre-extracted {text, timestamp} pairs. Timestamps get
    /// the same normalization treatment as extracted headers.
    pub fn preextracted(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let messages = pairs
            .into_iter()
            .map(|(text, timestamp_raw)| {
                let timestamp_iso = jobsift_extractor::normalize_timestamp(&timestamp_raw);
                RawMessage {
                    text,
                    timestamp_raw,
                    timestamp_iso,
                }
            })
            .collect();

        Self::Preextracted {
            name: name.into(),
            messages,
        }
    }

    /// Source name, recorded on every stored record.
    pub fn name(&self) -> &str {
        match self {
            Self::ExportFile { name, .. } => name,
            Self::Preextracted { name, .. } => name,
        }
    }

    /// Fetch this source's messages.
    ///
    /// An unreadable export is a fetch error; a readable document that
    /// contains no recognizable messages yields an empty sequence.
    pub fn fetch(&self) -> Result<Vec<RawMessage>> {
        match self {
            Self::ExportFile { path, .. } => {
                let bytes = std::fs::read(path).map_err(|e| {
                    JobsiftError::Fetch(format!("cannot read export {}: {e}", path.display()))
                })?;
                let html = String::from_utf8_lossy(&bytes);
                Ok(jobsift_extractor::extract(&html))
            }
            Self::Preextracted { messages, .. } => Ok(messages.clone()),
        }
    }
}
