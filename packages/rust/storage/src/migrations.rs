//! SQL migration definitions for the MarketScope report database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

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
        description: "Initial schema: reports keyed by record id, unique per thread",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One finished report per run (thread)
CREATE TABLE IF NOT EXISTS reports (
    id             TEXT PRIMARY KEY,
    thread_id      TEXT NOT NULL UNIQUE,
    user_id        TEXT,
    query          TEXT NOT NULL,
    report_json    TEXT NOT NULL,
    report_hash    TEXT NOT NULL,
    schema_version INTEGER NOT NULL,
    degraded_steps INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_user_id ON reports(user_id);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
