//! End-to-end ingestion pipeline: sources → extraction → structuring →
//! identity/insert → batch dedup → run summary.
//!
//! Sources are processed in isolation: a fetch or extraction failure is
//! recorded on that source's stats and the run moves on. Structuring calls
//! within a source fan out through a bounded worker pool; insert attempts are
//! serialized in this task, and the store's insert-if-absent is atomic, so a
//! post_id can never be written twice.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use jobsift_shared::{AppConfig, JobRecord, JobsiftError, Result, expand_home};
use jobsift_storage::{InsertOutcome, Storage};
use jobsift_structuring::{JobStructurer, OllamaClient, StructureOutcome};

use crate::source::Source;
use crate::summary::{RunSummary, SourceStats};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for one ingestion run — merged from the app config.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the jobs database.
    pub database_path: PathBuf,
    /// Completion provider settings.
    pub provider: jobsift_shared::ProviderConfig,
    /// Concurrent structuring calls per source.
    pub worker_pool: u32,
    /// Messages shorter than this are discarded before structuring.
    pub min_message_length: usize,
    /// Per-source cap on messages fed to the structuring engine.
    pub max_messages_per_source: usize,
    /// Similarity score recorded on dedup links.
    pub similarity_score: f64,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_path: expand_home(&config.defaults.database_path),
            provider: config.provider.clone(),
            worker_pool: config.defaults.worker_pool,
            min_message_length: config.extraction.min_message_length,
            max_messages_per_source: config.extraction.max_messages_per_source,
            similarity_score: config.dedup.similarity_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait RunProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a source's messages are known, before structuring starts.
    fn source_started(&self, name: &str, messages: usize);
    /// Message-level progress within a source.
    fn message_processed(&self, source: &str, current: usize, total: usize);
    /// Called once with the final summary.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_started(&self, _name: &str, _messages: usize) {}
    fn message_processed(&self, _source: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full ingestion pipeline across all sources.
///
/// Aborts only when storage cannot be opened/written or the completion
/// provider fails its one-time reachability check. Every other failure
/// degrades to per-source or per-message outcomes, and the summary is
/// emitted regardless of how many sources failed.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn run_ingestion(
    config: &RunConfig,
    sources: &[Source],
    progress: &dyn RunProgress,
) -> Result<RunSummary> {
    let start = Instant::now();

    progress.phase("Opening storage");
    let storage = Storage::open(&config.database_path).await?;

    progress.phase("Checking completion provider");
    let structurer = JobStructurer::new(OllamaClient::new(&config.provider)?);
    structurer.check_ready().await.map_err(|e| {
        JobsiftError::config(format!(
            "completion provider not ready at {}: {e}",
            config.provider.base_url
        ))
    })?;

    let mut summary = RunSummary::default();

    for source in sources {
        progress.phase(&format!("Processing source: {}", source.name()));
        let stats = process_source(config, source, &structurer, &storage, progress).await?;
        summary.sources.push(stats);
    }

    progress.phase("Linking duplicates");
    summary.duplicate_links = storage.link_duplicates(config.similarity_score).await?;
    summary.total_records = storage.count_records().await?;

    progress.done(&summary);

    info!(
        processed = summary.processed(),
        candidates = summary.candidates(),
        inserted = summary.inserted(),
        duplicates = summary.duplicates(),
        rejected = summary.rejected(),
        duplicate_links = summary.duplicate_links,
        total_records = summary.total_records,
        elapsed_ms = start.elapsed().as_millis(),
        "ingestion run complete"
    );

    Ok(summary)
}

/// Process one source end to end.
///
/// Returns `Err` only for storage failures (fatal). Fetch and extraction
/// failures are recorded on the stats so the run can continue.
async fn process_source(
    config: &RunConfig,
    source: &Source,
    structurer: &JobStructurer,
    storage: &Storage,
    progress: &dyn RunProgress,
) -> Result<SourceStats> {
    let name = source.name();
    let mut stats = SourceStats::new(name);

    let messages = match source.fetch() {
        Ok(messages) => messages,
        Err(e) => {
            warn!(source = name, error = %e, "source failed, continuing with the rest");
            stats.error = Some(e.to_string());
            return Ok(stats);
        }
    };

    let eligible: Vec<_> = messages
        .into_iter()
        .filter(|m| m.text.len() >= config.min_message_length)
        .take(config.max_messages_per_source)
        .collect();

    progress.source_started(name, eligible.len());
    info!(source = name, messages = eligible.len(), "structuring messages");

    // Fan structuring calls out through the bounded pool; results are
    // collected back in message order.
    let semaphore = Arc::new(Semaphore::new(config.worker_pool.max(1) as usize));
    let mut handles = Vec::with_capacity(eligible.len());

    for message in &eligible {
        let structurer = structurer.clone();
        let semaphore = semaphore.clone();
        let text = message.text.clone();
        let timestamp = message.timestamp().to_string();
        let source_name = name.to_string();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            structurer.structure(&text, &timestamp, &source_name).await
        }));
    }

    // Single-writer insertion: only this task touches the store.
    let total = handles.len();
    for (i, (message, handle)) in eligible.iter().zip(handles).enumerate() {
        stats.processed += 1;
        progress.message_processed(name, i + 1, total);

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(source = name, error = %e, "structuring task panicked");
                stats.rejected += 1;
                continue;
            }
        };

        match outcome {
            StructureOutcome::Candidate(candidate) => {
                stats.candidates += 1;
                let record = JobRecord::from_candidate(
                    &candidate,
                    name,
                    message.timestamp(),
                    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
                );

                match storage.insert_record(&record).await? {
                    InsertOutcome::Inserted => {
                        stats.inserted += 1;
                        info!(
                            source = name,
                            role = %record.role,
                            company = %record.company_name,
                            "record inserted"
                        );
                    }
                    InsertOutcome::Duplicate => {
                        stats.duplicates += 1;
                        info!(
                            source = name,
                            role = %record.role,
                            company = %record.company_name,
                            "duplicate posting"
                        );
                    }
                }
            }
            StructureOutcome::Invalid => {
                stats.rejected += 1;
            }
            StructureOutcome::Provider(e) => {
                warn!(source = name, error = %e, "provider failure, message rejected");
                stats.rejected += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsift_shared::{JobCandidate, PostId, ProviderConfig};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACME_MESSAGE: &str =
        "Hiring Python Developer at Acme Corp, Bangalore, 2-3 yrs, Remote, apply: jobs@acme.com";

    const ACME_REPLY: &str = r#"{"valid":true,"role":"Python Developer","company_name":"Acme Corp","location":"Bangalore","experience_required":"2-3 yrs","job_type":"Remote","application_link":"jobs@acme.com"}"#;

    fn test_config(server_uri: &str) -> RunConfig {
        RunConfig {
            database_path: std::env::temp_dir()
                .join(format!("jobsift_pipeline_{}.db", Uuid::now_v7())),
            provider: ProviderConfig {
                base_url: server_uri.into(),
                timeout_secs: 2,
                ..ProviderConfig::default()
            },
            worker_pool: 4,
            min_message_length: 30,
            max_messages_per_source: 200,
            similarity_score: 0.85,
        }
    }

    async fn mock_ready(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "gpt-oss:latest"}]
            })))
            .mount(server)
            .await;
    }

    async fn mock_completion(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": reply })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn accepted_message_is_inserted() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        mock_completion(&server, &format!("Sure, here you go: {ACME_REPLY} Thanks!")).await;

        let config = test_config(&server.uri());
        let sources = vec![Source::preextracted(
            "Test Channel",
            vec![(ACME_MESSAGE.to_string(), "14:32".to_string())],
        )];

        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.candidates(), 1);
        assert_eq!(summary.inserted(), 1);
        assert_eq!(summary.duplicates(), 0);
        assert_eq!(summary.rejected(), 0);
        assert_eq!(summary.total_records, 1);

        let storage = Storage::open(&config.database_path).await.unwrap();
        let stored = storage
            .get_record(&PostId::derive("Acme Corp", "Python Developer", "Bangalore"))
            .await
            .unwrap()
            .expect("stored record");
        assert_eq!(stored.role, "Python Developer");
        assert_eq!(stored.source, "Test Channel");
        assert_eq!(stored.date_posted, "14:32");
    }

    #[tokio::test]
    async fn repost_with_different_timestamp_is_a_duplicate() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        mock_completion(&server, ACME_REPLY).await;

        let config = test_config(&server.uri());

        let first = vec![Source::preextracted(
            "Test Channel",
            vec![(ACME_MESSAGE.to_string(), "14:32".to_string())],
        )];
        let summary = run_ingestion(&config, &first, &SilentProgress).await.unwrap();
        assert_eq!(summary.inserted(), 1);

        // Same posting again, different timestamp.
        let second = vec![Source::preextracted(
            "Test Channel",
            vec![(ACME_MESSAGE.to_string(), "12/06/2024, 9:00 AM".to_string())],
        )];
        let summary = run_ingestion(&config, &second, &SilentProgress).await.unwrap();
        assert_eq!(summary.inserted(), 0);
        assert_eq!(summary.duplicates(), 1);
        assert_eq!(summary.total_records, 1);
    }

    #[tokio::test]
    async fn invalid_reply_rejects_without_storage_write() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        mock_completion(&server, r#"{"valid": false}"#).await;

        let config = test_config(&server.uri());
        let sources = vec![Source::preextracted(
            "Test Channel",
            vec![("good morning everyone, have a great day".to_string(), "09:00".to_string())],
        )];

        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(summary.rejected(), 1);
        assert_eq!(summary.candidates(), 0);
        assert_eq!(summary.total_records, 0);
    }

    #[tokio::test]
    async fn short_messages_are_discarded_before_structuring() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        // No /api/generate mock: a structuring call would 404 and reject.

        let config = test_config(&server.uri());
        let sources = vec![Source::preextracted(
            "Test Channel",
            vec![("hi".to_string(), "09:00".to_string())],
        )];

        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(summary.processed(), 0);
        assert_eq!(summary.rejected(), 0);
    }

    #[tokio::test]
    async fn failed_source_does_not_stop_the_run() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        mock_completion(&server, ACME_REPLY).await;

        let config = test_config(&server.uri());
        let sources = vec![
            Source::export_file("Broken Export", "/nonexistent/export.html"),
            Source::preextracted(
                "Working Channel",
                vec![(ACME_MESSAGE.to_string(), "14:32".to_string())],
            ),
        ];

        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(summary.sources.len(), 2);
        assert!(summary.sources[0].error.as_deref().unwrap().contains("export"));
        assert_eq!(summary.sources[1].inserted, 1);
        assert_eq!(summary.failed_sources().count(), 1);
        assert_eq!(summary.total_records, 1);
    }

    #[tokio::test]
    async fn unreachable_provider_aborts_before_processing() {
        // Nothing listens here; the precondition check must fail the run.
        let config = test_config("http://127.0.0.1:9");
        let sources = vec![Source::preextracted(
            "Test Channel",
            vec![(ACME_MESSAGE.to_string(), "14:32".to_string())],
        )];

        let err = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("provider not ready"));
    }

    #[tokio::test]
    async fn dedup_pass_links_legacy_identity_twins() {
        let server = MockServer::start().await;
        mock_ready(&server).await;
        mock_completion(&server, ACME_REPLY).await;

        let config = test_config(&server.uri());

        // Seed a record for the same posting stored under a legacy post_id
        // derivation, as an older ingestion scheme would have left behind.
        {
            let storage = Storage::open(&config.database_path).await.unwrap();
            let candidate = JobCandidate {
                role: "Python Developer".into(),
                company_name: "Acme Corp".into(),
                location: "Bangalore".into(),
                experience_required: None,
                job_type: None,
                application_link: None,
                description: Some("older copy of the same posting".into()),
            };
            let mut legacy = JobRecord::from_candidate(
                &candidate,
                "Legacy Import",
                "2024-05-01T00:00:00",
                "2024-05-01T00:00:00",
            );
            legacy.post_id = PostId::from_stored("legacy-derivation-123");
            storage.insert_record(&legacy).await.unwrap();
        }

        let sources = vec![Source::preextracted(
            "Test Channel",
            vec![(ACME_MESSAGE.to_string(), "14:32".to_string())],
        )];
        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        // Content-hash insert succeeded (different post_id), and the batch
        // pass linked the pair exactly once.
        assert_eq!(summary.inserted(), 1);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.duplicate_links, 1);

        let storage = Storage::open(&config.database_path).await.unwrap();
        let links = storage.list_duplicate_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].original_post_id.as_str(), "legacy-derivation-123");
    }

    #[tokio::test]
    async fn summary_is_emitted_when_every_source_fails() {
        let server = MockServer::start().await;
        mock_ready(&server).await;

        let config = test_config(&server.uri());
        let sources = vec![
            Source::export_file("Gone A", "/nonexistent/a.html"),
            Source::export_file("Gone B", "/nonexistent/b.html"),
        ];

        let summary = run_ingestion(&config, &sources, &SilentProgress)
            .await
            .expect("run");

        assert_eq!(summary.sources.len(), 2);
        assert_eq!(summary.failed_sources().count(), 2);
        assert_eq!(summary.processed(), 0);
        assert_eq!(summary.total_records, 0);
    }
}
