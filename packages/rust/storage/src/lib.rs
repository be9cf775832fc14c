//! Turso Embedded / libSQL storage layer for finished research reports.
//!
//! The [`Storage`] struct wraps a libSQL database holding one row per run.
//! Rows are keyed by a UUID v7 record id and unique on `thread_id`, so a
//! repeated persist for the same run updates the row instead of duplicating it.
//!
//! **Access rules:**
//! - `marketscope run`: read-write via [`Storage::open`]
//! - `marketscope reports`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use marketscope_shared::{MarketReport, MarketScopeError, RecordId, ReportSink, Result};

/// Default page size for [`Storage::list_reports`].
pub const DEFAULT_LIST_LIMIT: u32 = 20;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Listing view of a stored report (no body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub id: RecordId,
    pub thread_id: String,
    pub user_id: Option<String>,
    pub query: String,
    /// Steps that ended degraded or failed.
    pub degraded_steps: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored report with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub summary: ReportSummary,
    /// SHA-256 of `report_json`, hex-encoded.
    pub report_hash: String,
    pub report: MarketReport,
}

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
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MarketScopeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MarketScopeError::Storage(format!(
                "no report database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

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
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        MarketScopeError::Storage(format!(
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
            return Err(MarketScopeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Report operations
    // -----------------------------------------------------------------------

    /// Insert a report, or update the existing row for the same thread.
    ///
    /// Returns the record id of the row, which is stable across repeats.
    #[instrument(skip_all, fields(thread_id = %report.query.thread_id))]
    pub async fn upsert_report(&self, report: &MarketReport) -> Result<RecordId> {
        self.check_writable()?;

        let report_json = serde_json::to_string(report)
            .map_err(|e| MarketScopeError::Storage(format!("report serialization failed: {e}")))?;
        let report_hash = content_hash(&report_json);
        let now = Utc::now().to_rfc3339();
        let created_at = report.created_at.to_rfc3339();
        let candidate_id = RecordId::new().to_string();

        self.conn
            .execute(
                "INSERT INTO reports (id, thread_id, user_id, query, report_json, report_hash,
                                      schema_version, degraded_steps, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(thread_id) DO UPDATE SET
                   user_id = excluded.user_id,
                   query = excluded.query,
                   report_json = excluded.report_json,
                   report_hash = excluded.report_hash,
                   schema_version = excluded.schema_version,
                   degraded_steps = excluded.degraded_steps,
                   updated_at = excluded.updated_at",
                params![
                    candidate_id.as_str(),
                    report.query.thread_id.as_str(),
                    report.query.user_id.as_deref(),
                    report.query.text.as_str(),
                    report_json.as_str(),
                    report_hash.as_str(),
                    i64::from(report.schema_version),
                    report.ledger.degraded_count() as i64,
                    created_at.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        let id = self
            .record_id_for_thread(report.query.thread_id.as_str())
            .await?
            .ok_or_else(|| MarketScopeError::Storage("report row missing after upsert".into()))?;

        debug!(record_id = %id, hash = %report_hash, "report persisted");
        Ok(id)
    }

    /// Get a report by record id.
    pub async fn get_report(&self, id: RecordId) -> Result<Option<StoredReport>> {
        self.query_one_report(
            "SELECT id, thread_id, user_id, query, degraded_steps, created_at, updated_at,
                    report_hash, report_json
             FROM reports WHERE id = ?1",
            id.to_string(),
        )
        .await
    }

    /// Get the report produced by a given thread.
    pub async fn get_report_by_thread(&self, thread_id: &str) -> Result<Option<StoredReport>> {
        self.query_one_report(
            "SELECT id, thread_id, user_id, query, degraded_steps, created_at, updated_at,
                    report_hash, report_json
             FROM reports WHERE thread_id = ?1",
            thread_id.to_string(),
        )
        .await
    }

    /// List reports, newest first, optionally for one user.
    pub async fn list_reports(&self, user_id: Option<&str>, limit: u32) -> Result<Vec<ReportSummary>> {
        let limit = i64::from(limit.max(1));
        let mut rows = match user_id {
            Some(user) => {
                self.conn
                    .query(
                        "SELECT id, thread_id, user_id, query, degraded_steps, created_at, updated_at
                         FROM reports WHERE user_id = ?1
                         ORDER BY created_at DESC, id DESC LIMIT ?2",
                        params![user, limit],
                    )
                    .await
            }
            None => {
                self.conn
                    .query(
                        "SELECT id, thread_id, user_id, query, degraded_steps, created_at, updated_at
                         FROM reports ORDER BY created_at DESC, id DESC LIMIT ?1",
                        params![limit],
                    )
                    .await
            }
        }
        .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?
        {
            results.push(row_to_summary(&row)?);
        }
        Ok(results)
    }

    async fn record_id_for_thread(&self, thread_id: &str) -> Result<Option<RecordId>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM reports WHERE thread_id = ?1", params![thread_id])
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| MarketScopeError::Storage(e.to_string()))?;
                Ok(Some(parse_record_id(&raw)?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(MarketScopeError::Storage(e.to_string())),
        }
    }

    async fn query_one_report(&self, sql: &str, key: String) -> Result<Option<StoredReport>> {
        let mut rows = self
            .conn
            .query(sql, params![key])
            .await
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let summary = row_to_summary(&row)?;
                let report_hash: String = row
                    .get(7)
                    .map_err(|e| MarketScopeError::Storage(e.to_string()))?;
                let report_json: String = row
                    .get(8)
                    .map_err(|e| MarketScopeError::Storage(e.to_string()))?;
                let report = serde_json::from_str(&report_json).map_err(|e| {
                    MarketScopeError::Storage(format!("stored report {} is unreadable: {e}", summary.id))
                })?;
                Ok(Some(StoredReport {
                    summary,
                    report_hash,
                    report,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(MarketScopeError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl ReportSink for Storage {
    async fn persist(&self, report: &MarketReport) -> Result<RecordId> {
        self.upsert_report(report).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 of `content`.
fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn parse_record_id(raw: &str) -> Result<RecordId> {
    Uuid::parse_str(raw)
        .map(RecordId)
        .map_err(|e| MarketScopeError::Storage(format!("invalid record id {raw}: {e}")))
}

/// Convert the first seven columns of a row to a [`ReportSummary`].
fn row_to_summary(row: &libsql::Row) -> Result<ReportSummary> {
    let id: String = row
        .get(0)
        .map_err(|e| MarketScopeError::Storage(e.to_string()))?;
    Ok(ReportSummary {
        id: parse_record_id(&id)?,
        thread_id: row
            .get::<String>(1)
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?,
        user_id: row.get::<String>(2).ok(),
        query: row
            .get::<String>(3)
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?,
        degraded_steps: row.get::<i64>(4).map(|v| v.max(0) as u32).unwrap_or(0),
        created_at: row
            .get::<String>(5)
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?,
        updated_at: row
            .get::<String>(6)
            .map_err(|e| MarketScopeError::Storage(e.to_string()))?,
    })
}
