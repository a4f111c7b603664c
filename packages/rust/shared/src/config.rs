//! Application configuration for Jobsift.
//!
//! User config lives at `~/.jobsift/jobsift.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JobsiftError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "jobsift.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".jobsift";

// ---------------------------------------------------------------------------
// Config structs (matching jobsift.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text-completion provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Message extraction policies.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Duplicate-linking settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Registered message sources (exported chat documents).
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the jobs database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Concurrent structuring calls per source.
    #[serde(default = "default_worker_pool")]
    pub worker_pool: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            worker_pool: default_worker_pool(),
        }
    }
}

fn default_database_path() -> String {
    "~/.jobsift/jobs.db".into()
}
fn default_worker_pool() -> u32 {
    4
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Ollama-compatible completion server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name to request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature. Kept low to bias toward reproducible output.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling parameter.
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Maximum tokens in the completion.
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            num_predict: default_num_predict(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "gpt-oss".into()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_top_p() -> f64 {
    0.9
}
fn default_num_predict() -> u32 {
    300
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Messages shorter than this are dropped before structuring.
    #[serde(default = "default_min_message_length")]
    pub min_message_length: usize,

    /// Per-source cap on messages fed to the structuring engine.
    #[serde(default = "default_max_messages_per_source")]
    pub max_messages_per_source: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_message_length: default_min_message_length(),
            max_messages_per_source: default_max_messages_per_source(),
        }
    }
}

fn default_min_message_length() -> usize {
    30
}
fn default_max_messages_per_source() -> usize {
    200
}

/// `[dedup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Similarity score recorded on links produced by the batch pass.
    #[serde(default = "default_similarity_score")]
    pub similarity_score: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_score: default_similarity_score(),
        }
    }
}

fn default_similarity_score() -> f64 {
    0.85
}

/// `[[sources]]` entry — a registered exported chat document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Human-readable source name, recorded on every stored record.
    pub name: String,
    /// Path to the exported document on disk.
    pub path: String,
    /// Disabled sources are skipped by a run.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.jobsift/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| JobsiftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.jobsift/jobsift.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| JobsiftError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| JobsiftError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| JobsiftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| JobsiftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| JobsiftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` in a configured path against the user's home.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("localhost:11434"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.provider.timeout_secs, 60);
        assert_eq!(parsed.extraction.min_message_length, 30);
        assert_eq!(parsed.dedup.similarity_score, 0.85);
    }

    #[test]
    fn config_with_sources() {
        let toml_str = r#"
[provider]
model = "llama3"

[[sources]]
name = "Jobs Channel 1"
path = "/tmp/exports/channel1.html"

[[sources]]
name = "Jobs Channel 2"
path = "/tmp/exports/channel2.html"
enabled = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.provider.model, "llama3");
        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].enabled);
        assert!(!config.sources[1].enabled);
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config: AppConfig = toml::from_str("[extraction]\nmin_message_length = 10\n")
            .expect("parse");
        assert_eq!(config.extraction.min_message_length, 10);
        assert_eq!(config.extraction.max_messages_per_source, 200);
        assert_eq!(config.defaults.worker_pool, 4);
    }

    #[test]
    fn expand_home_passthrough_for_absolute_paths() {
        assert_eq!(expand_home("/var/db/jobs.db"), PathBuf::from("/var/db/jobs.db"));
    }
}
