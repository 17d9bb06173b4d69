//! SQL migration definitions for the dexrefresh cache database.
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
        description: "Initial schema: creatures, refresh_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Enriched creatures from the latest successful refresh
CREATE TABLE IF NOT EXISTS creatures (
    id                  INTEGER PRIMARY KEY,
    name                TEXT NOT NULL,
    height              INTEGER NOT NULL,
    weight              INTEGER NOT NULL,
    flat_abilities      TEXT NOT NULL,
    effect_entries_json TEXT NOT NULL,
    refreshed_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_creatures_name ON creatures(name);

-- One row per successful save
CREATE TABLE IF NOT EXISTS refresh_runs (
    id             TEXT PRIMARY KEY,
    refreshed_at   TEXT NOT NULL,
    creature_count INTEGER NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
