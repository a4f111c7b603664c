//! Ingestion orchestration for Jobsift.
//!
//! Ties the extractor, structuring engine, and storage into one resumable
//! run: per-source isolation, bounded structuring concurrency, single-writer
//! insertion, a batch dedup pass, and a run summary that is always emitted.

pub mod pipeline;
pub mod source;
pub mod summary;

pub use pipeline::{RunConfig, RunProgress, SilentProgress, run_ingestion};
pub use source::Source;
pub use summary::{RunSummary, SourceStats};
