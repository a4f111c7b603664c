//! SQL migration definitions for the Jobsift database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: job_records, duplicate_links",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Accepted job postings. Immutable once written: the unique post_id makes
-- insert-if-absent the only write path, and there is no update path.
CREATE TABLE IF NOT EXISTS job_records (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id             TEXT UNIQUE NOT NULL,
    role                TEXT NOT NULL,
    company_name        TEXT NOT NULL,
    location            TEXT,
    experience_required TEXT,
    job_type            TEXT,
    application_link    TEXT,
    description         TEXT,
    source              TEXT,
    date_posted         TEXT NOT NULL,
    extracted_at        TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_job_records_date_posted ON job_records(date_posted);
CREATE INDEX IF NOT EXISTS idx_job_records_source ON job_records(source);
CREATE INDEX IF NOT EXISTS idx_job_records_tuple
    ON job_records(company_name, role, location);

-- Links between records that represent the same underlying posting,
-- produced by the batch dedup pass. Append-only; one link per pair.
CREATE TABLE IF NOT EXISTS duplicate_links (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    original_post_id  TEXT NOT NULL,
    duplicate_post_id TEXT NOT NULL,
    similarity_score  REAL,
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(original_post_id, duplicate_post_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
