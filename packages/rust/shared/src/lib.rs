//! Shared types, error model, and configuration for Jobsift.
//!
//! This crate is the foundation depended on by all other Jobsift crates.
//! It provides:
//! - [`JobsiftError`] — the unified error type
//! - Domain types ([`RawMessage`], [`JobCandidate`], [`JobRecord`], [`PostId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DedupConfig, DefaultsConfig, ExtractionConfig, ProviderConfig, SourceEntry,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{JobsiftError, Result};
pub use types::{
    DuplicateLink, JobCandidate, JobRecord, PostId, RawMessage, identity_key, normalize_field,
};
