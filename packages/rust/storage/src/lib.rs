//! libSQL storage layer for job records and duplicate links.
//!
//! The [`Storage`] struct wraps a local libSQL database. Writes go through
//! two operations only: the atomic insert-if-absent for records and the
//! conflict-ignoring link insert used by the batch dedup pass. Records are
//! immutable once written.
//!
//! **Access rules:**
//! - Ingestion runs: read-write (sole writer) via [`Storage::open`]
//! - Dashboard/API consumers: read-only via [`Storage::open_readonly`]

mod migrations;

use std::collections::HashMap;
use std::path::Path;

use libsql::{Connection, Database, Value, params};

use jobsift_shared::{
    DuplicateLink, JobRecord, JobsiftError, PostId, Result, identity_key,
};

// ---------------------------------------------------------------------------
// Read-side types
// ---------------------------------------------------------------------------

/// Outcome of an insert attempt. A conflict is not an error: it means the
/// posting is already stored and the attempt is reported as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Filters for listing records. All filters are conjunctive; absent filters
/// match everything.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Substring match on job_type.
    pub job_type: Option<String>,
    /// Substring match on location.
    pub location: Option<String>,
    /// Substring match on company_name.
    pub company: Option<String>,
    /// Exact source name.
    pub source: Option<String>,
    /// Substring match across role, company_name, and description.
    pub search: Option<String>,
    /// Inclusive lower bound on date_posted (ISO string compare).
    pub posted_after: Option<String>,
    /// Inclusive upper bound on date_posted (ISO string compare).
    pub posted_before: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub page_size: u32,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            job_type: None,
            location: None,
            company: None,
            source: None,
            search: None,
            posted_after: None,
            posted_before: None,
            page: 1,
            page_size: 20,
        }
    }
}

/// One page of filtered records, newest postings first.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<JobRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Columns exposed through the distinct-values read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctColumn {
    Source,
    Location,
    Company,
    JobType,
}

impl DistinctColumn {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Location => "location",
            Self::Company => "company_name",
            Self::JobType => "job_type",
        }
    }
}

const RECORD_COLUMNS: &str = "post_id, role, company_name, location, experience_required, \
     job_type, application_link, description, source, date_posted, extracted_at, created_at";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    ///
    /// A failure here is fatal for a run: nothing can be persisted.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JobsiftError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (dashboard consumers).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    JobsiftError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(JobsiftError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Record writes
    // -----------------------------------------------------------------------

    /// Atomic insert-if-absent for a job record.
    ///
    /// An attempt whose post_id already exists never overwrites the stored
    /// row; it reports [`InsertOutcome::Duplicate`]. The single conflict-
    /// ignoring statement is atomic with respect to concurrent callers.
    pub async fn insert_record(&self, record: &JobRecord) -> Result<InsertOutcome> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "INSERT INTO job_records
                 (post_id, role, company_name, location, experience_required,
                  job_type, application_link, description, source, date_posted, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(post_id) DO NOTHING",
                params![
                    record.post_id.as_str(),
                    record.role.as_str(),
                    record.company_name.as_str(),
                    record.location.as_str(),
                    record.experience_required.as_deref(),
                    record.job_type.as_deref(),
                    record.application_link.as_deref(),
                    record.description.as_deref(),
                    record.source.as_str(),
                    record.date_posted.as_str(),
                    record.extracted_at.as_str(),
                ],
            )
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        Ok(if affected > 0 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    // -----------------------------------------------------------------------
    // Record reads
    // -----------------------------------------------------------------------

    /// Fetch a single record by its post_id.
    pub async fn get_record(&self, post_id: &PostId) -> Result<Option<JobRecord>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM job_records WHERE post_id = ?1"),
                params![post_id.as_str()],
            )
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(JobsiftError::Storage(e.to_string())),
        }
    }

    /// Total number of stored records.
    pub async fn count_records(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM job_records", params![])
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0).max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(JobsiftError::Storage(e.to_string())),
        }
    }

    /// List records matching a filter, newest postings first, paginated.
    pub async fn list_records(&self, filter: &RecordFilter) -> Result<RecordPage> {
        let (where_sql, where_params) = build_where(filter);

        // Total count before pagination
        let count_sql = format!("SELECT COUNT(*) FROM job_records{where_sql}");
        let mut rows = self
            .conn
            .query(&count_sql, where_params.clone())
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;
        let total: u64 = match rows.next().await {
            Ok(Some(row)) => row.get::<i64>(0).unwrap_or(0).max(0) as u64,
            _ => 0,
        };

        let page = filter.page.max(1);
        let page_size = filter.page_size.max(1);
        let offset = u64::from(page - 1) * u64::from(page_size);

        let list_sql = format!(
            "SELECT {RECORD_COLUMNS} FROM job_records{where_sql}
             ORDER BY date_posted DESC LIMIT ? OFFSET ?"
        );
        let mut list_params = where_params;
        list_params.push(Value::from(i64::from(page_size)));
        list_params.push(Value::from(offset as i64));

        let mut rows = self
            .conn
            .query(&list_sql, list_params)
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            records.push(row_to_record(&row)?);
        }

        let total_pages = total.div_ceil(u64::from(page_size)) as u32;

        Ok(RecordPage {
            records,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    /// Distinct non-empty values of a column, sorted.
    pub async fn distinct_values(&self, column: DistinctColumn) -> Result<Vec<String>> {
        let col = column.as_sql();
        let sql = format!(
            "SELECT DISTINCT {col} FROM job_records
             WHERE {col} IS NOT NULL AND {col} != '' ORDER BY {col}"
        );

        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let mut values = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            values.push(
                row.get::<String>(0)
                    .map_err(|e| JobsiftError::Storage(e.to_string()))?,
            );
        }
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // Duplicate linking
    // -----------------------------------------------------------------------

    /// Batch dedup pass: link every pair of stored records that share a
    /// normalized (company_name, role, location) tuple.
    ///
    /// Records are grouped by the identity key rather than self-joined; the
    /// produced link set is identical to the quadratic scan, with the earlier
    /// row of each pair as the original. One link per pair: re-running the
    /// pass creates nothing new. Returns the number of links created.
    pub async fn link_duplicates(&self, similarity_score: f64) -> Result<usize> {
        self.check_writable()?;

        let mut rows = self
            .conn
            .query(
                "SELECT post_id, company_name, role, location FROM job_records ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        // Group post_ids by normalized tuple, preserving insertion order.
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        while let Ok(Some(row)) = rows.next().await {
            let post_id: String = row
                .get(0)
                .map_err(|e| JobsiftError::Storage(e.to_string()))?;
            let company: String = row.get(1).unwrap_or_default();
            let role: String = row.get(2).unwrap_or_default();
            let location: String = row.get::<String>(3).unwrap_or_default();

            groups
                .entry(identity_key(&company, &role, &location))
                .or_default()
                .push(post_id);
        }

        let mut created = 0usize;
        for ids in groups.values().filter(|ids| ids.len() > 1) {
            for (i, original) in ids.iter().enumerate() {
                for duplicate in &ids[i + 1..] {
                    let affected = self
                        .conn
                        .execute(
                            "INSERT INTO duplicate_links
                             (original_post_id, duplicate_post_id, similarity_score)
                             VALUES (?1, ?2, ?3)
                             ON CONFLICT(original_post_id, duplicate_post_id) DO NOTHING",
                            params![original.as_str(), duplicate.as_str(), similarity_score],
                        )
                        .await
                        .map_err(|e| JobsiftError::Storage(e.to_string()))?;
                    created += affected as usize;
                }
            }
        }

        tracing::info!(links_created = created, "dedup pass complete");
        Ok(created)
    }

    /// All duplicate links, oldest first.
    pub async fn list_duplicate_links(&self) -> Result<Vec<DuplicateLink>> {
        let mut rows = self
            .conn
            .query(
                "SELECT original_post_id, duplicate_post_id, similarity_score, created_at
                 FROM duplicate_links ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| JobsiftError::Storage(e.to_string()))?;

        let mut links = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            links.push(DuplicateLink {
                original_post_id: PostId::from_stored(
                    row.get::<String>(0)
                        .map_err(|e| JobsiftError::Storage(e.to_string()))?,
                ),
                duplicate_post_id: PostId::from_stored(
                    row.get::<String>(1)
                        .map_err(|e| JobsiftError::Storage(e.to_string()))?,
                ),
                similarity_score: row.get::<f64>(2).unwrap_or(0.0),
                created_at: row.get::<String>(3).ok(),
            });
        }
        Ok(links)
    }
}

/// Build the WHERE clause and its parameters for a record filter.
fn build_where(filter: &RecordFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(search) = &filter.search {
        clauses.push("(role LIKE ? OR company_name LIKE ? OR description LIKE ?)");
        let term = format!("%{search}%");
        params.push(Value::from(term.clone()));
        params.push(Value::from(term.clone()));
        params.push(Value::from(term));
    }
    if let Some(job_type) = &filter.job_type {
        clauses.push("job_type LIKE ?");
        params.push(Value::from(format!("%{job_type}%")));
    }
    if let Some(location) = &filter.location {
        clauses.push("location LIKE ?");
        params.push(Value::from(format!("%{location}%")));
    }
    if let Some(company) = &filter.company {
        clauses.push("company_name LIKE ?");
        params.push(Value::from(format!("%{company}%")));
    }
    if let Some(source) = &filter.source {
        clauses.push("source = ?");
        params.push(Value::from(source.clone()));
    }
    if let Some(after) = &filter.posted_after {
        clauses.push("date_posted >= ?");
        params.push(Value::from(after.clone()));
    }
    if let Some(before) = &filter.posted_before {
        clauses.push("date_posted <= ?");
        params.push(Value::from(before.clone()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

/// Convert a database row to a [`JobRecord`].
fn row_to_record(row: &libsql::Row) -> Result<JobRecord> {
    Ok(JobRecord {
        post_id: PostId::from_stored(
            row.get::<String>(0)
                .map_err(|e| JobsiftError::Storage(e.to_string()))?,
        ),
        role: row
            .get::<String>(1)
            .map_err(|e| JobsiftError::Storage(e.to_string()))?,
        company_name: row
            .get::<String>(2)
            .map_err(|e| JobsiftError::Storage(e.to_string()))?,
        location: row.get::<String>(3).unwrap_or_default(),
        experience_required: row.get::<String>(4).ok(),
        job_type: row.get::<String>(5).ok(),
        application_link: row.get::<String>(6).ok(),
        description: row.get::<String>(7).ok(),
        source: row.get::<String>(8).unwrap_or_default(),
        date_posted: row
            .get::<String>(9)
            .map_err(|e| JobsiftError::Storage(e.to_string()))?,
        extracted_at: row.get::<String>(10).unwrap_or_default(),
        created_at: row.get::<String>(11).ok(),
    })
}
