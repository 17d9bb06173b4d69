//! libSQL cache for enriched creatures.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the creature
//! set of the latest successful refresh and a history of refresh runs. It is
//! the [`CacheSink`] of the refresh pipeline.

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use dexrefresh_shared::{CacheSink, Creature, DexError, Result};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// Summary of one saved refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRun {
    pub id: String,
    pub refreshed_at: DateTime<Utc>,
    pub creature_count: usize,
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DexError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        let conn = db.connect().map_err(|e| DexError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
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
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DexError::Storage(format!("migration v{} failed: {e}", migration.version))
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

    // -----------------------------------------------------------------------
    // Creature operations
    // -----------------------------------------------------------------------

    /// Replace the cached creature set with `creatures` in one transaction and
    /// record the run. Returns the run summary.
    #[instrument(skip_all, fields(creatures = creatures.len()))]
    pub async fn save_creatures(&self, creatures: &[Creature]) -> Result<RefreshRun> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let run_id = Uuid::now_v7().to_string();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        tx.execute("DELETE FROM creatures", params![])
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        for c in creatures {
            let effects = serde_json::to_string(&c.effect_entries)
                .map_err(|e| DexError::Storage(format!("creature {}: {e}", c.id)))?;
            tx.execute(
                "INSERT INTO creatures
                    (id, name, height, weight, flat_abilities, effect_entries_json, refreshed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    i64::from(c.id),
                    c.name.as_str(),
                    i64::from(c.height),
                    i64::from(c.weight),
                    c.flat_abilities.as_str(),
                    effects.as_str(),
                    stamp.as_str()
                ],
            )
            .await
            .map_err(|e| DexError::Storage(format!("creature {}: {e}", c.id)))?;
        }

        tx.execute(
            "INSERT INTO refresh_runs (id, refreshed_at, creature_count) VALUES (?1, ?2, ?3)",
            params![run_id.as_str(), stamp.as_str(), creatures.len() as i64],
        )
        .await
        .map_err(|e| DexError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        info!(run_id = %run_id, "creature cache replaced");
        Ok(RefreshRun {
            id: run_id,
            refreshed_at: now,
            creature_count: creatures.len(),
        })
    }

    /// List cached creatures ordered by id.
    pub async fn list_creatures(&self) -> Result<Vec<Creature>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, height, weight, flat_abilities, effect_entries_json
                 FROM creatures ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        let mut creatures = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?
        {
            creatures.push(row_to_creature(&row)?);
        }
        Ok(creatures)
    }

    /// Get a cached creature by id.
    pub async fn get_creature(&self, id: u32) -> Result<Option<Creature>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, height, weight, flat_abilities, effect_entries_json
                 FROM creatures WHERE id = ?1",
                params![i64::from(id)],
            )
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_creature(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DexError::Storage(e.to_string())),
        }
    }

    /// The most recent saved refresh, if any.
    pub async fn last_refresh(&self) -> Result<Option<RefreshRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, refreshed_at, creature_count FROM refresh_runs
                 ORDER BY refreshed_at DESC, id DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(|e| DexError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id: String = row.get(0).map_err(|e| DexError::Storage(e.to_string()))?;
                let stamp: String = row.get(1).map_err(|e| DexError::Storage(e.to_string()))?;
                let count: i64 = row.get(2).map_err(|e| DexError::Storage(e.to_string()))?;
                Ok(Some(RefreshRun {
                    id,
                    refreshed_at: parse_timestamp(&stamp)?,
                    creature_count: count as usize,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DexError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl CacheSink for Storage {
    async fn save(&self, cancel: &CancellationToken, creatures: &[Creature]) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(DexError::Cancelled);
        }
        self.save_creatures(creatures).await.map(|_| ())
    }
}

/// Convert a database row to a [`Creature`].
fn row_to_creature(row: &libsql::Row) -> Result<Creature> {
    let effects: String = row.get(5).map_err(|e| DexError::Storage(e.to_string()))?;
    Ok(Creature {
        id: row
            .get::<u32>(0)
            .map_err(|e| DexError::Storage(e.to_string()))?,
        name: row
            .get::<String>(1)
            .map_err(|e| DexError::Storage(e.to_string()))?,
        height: row
            .get::<u32>(2)
            .map_err(|e| DexError::Storage(e.to_string()))?,
        weight: row
            .get::<u32>(3)
            .map_err(|e| DexError::Storage(e.to_string()))?,
        flat_abilities: row
            .get::<String>(4)
            .map_err(|e| DexError::Storage(e.to_string()))?,
        effect_entries: serde_json::from_str(&effects)
            .map_err(|e| DexError::Storage(format!("invalid effect_entries_json: {e}")))?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DexError::Storage(format!("invalid date: {e}")))
}
