//! Flat-file record source for dexrefresh.
//!
//! This crate provides:
//! - [`table`]: the header-checked record table format (parse and format)
//! - [`segment`]: the segmented reader that parses a table on parallel tasks
//! - [`CsvRecordSource`]: the [`RecordSource`] backed by a file on disk

pub mod segment;
pub mod table;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, instrument};

use dexrefresh_shared::{Creature, DexError, PipelineContext, RecordSource, Result, SegmentStream};

pub use segment::{segment_ranges, spawn_segments};
pub use table::{RawRecord, RecordTable, format_table, join_abilities, parse_creature, parse_table};

/// Record source reading and writing a comma-delimited file.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    worker_count: usize,
}

impl CsvRecordSource {
    /// Create a source over `path`, parsed with `worker_count` segments.
    pub fn new(path: impl Into<PathBuf>, worker_count: usize) -> Self {
        Self {
            path: path.into(),
            worker_count: worker_count.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and validate its header and row shapes.
    pub async fn load_table(&self) -> Result<RecordTable> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DexError::io(&self.path, e))?;
        parse_table(&content)
    }

    /// Overwrite the file with `creatures`. Effect lists are not persisted.
    #[instrument(skip_all, fields(path = %self.path.display(), creatures = creatures.len()))]
    pub async fn write(&self, creatures: &[Creature]) -> Result<()> {
        let content = format_table(creatures)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DexError::io(parent, e))?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| DexError::io(&self.path, e))?;

        info!("records written");
        Ok(())
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    #[instrument(skip_all, fields(path = %self.path.display(), workers = self.worker_count))]
    async fn read(&self, ctx: &PipelineContext) -> Result<Vec<SegmentStream>> {
        let table = self.load_table().await?;
        let rows = table.len();
        let streams = spawn_segments(table, self.worker_count, ctx);

        info!(rows, segments = streams.len(), "record table loaded");
        Ok(streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn creature(id: u32, name: &str, refs: &[&str]) -> Creature {
        Creature {
            id,
            name: name.into(),
            height: id * 2,
            weight: id * 10,
            flat_abilities: join_abilities(refs.iter().copied()),
            effect_entries: Vec::new(),
        }
    }

    async fn drain(streams: Vec<SegmentStream>) -> Vec<Creature> {
        let mut out = Vec::new();
        for mut s in streams {
            while let Some(item) = s.entities.recv().await {
                out.push(item.unwrap());
            }
        }
        out
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let tmp_dir = std::env::temp_dir().join(format!("dexrefresh-records-{}", Uuid::now_v7()));
        let source = CsvRecordSource::new(tmp_dir.join("nested").join("pokemons.csv"), 3);

        let written = vec![
            creature(1, "bulbasaur", &["https://a/65/", "https://a/34/"]),
            creature(4, "charmander", &["https://a/66/"]),
            creature(7, "squirtle", &[]),
            creature(25, "pikachu", &["https://a/9/"]),
            creature(39, "jigglypuff", &["https://a/56/", "https://a/172/"]),
        ];
        source.write(&written).await.unwrap();

        let ctx = PipelineContext::child_of(&CancellationToken::new());
        let streams = source.read(&ctx).await.unwrap();
        let ranges: Vec<_> = streams.iter().map(|s| s.range.clone()).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..5]);

        let read = drain(streams).await;
        assert_eq!(read, written);
        ctx.shutdown().await;

        let _ = std::fs::remove_dir_all(&tmp_dir);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = CsvRecordSource::new(
            std::env::temp_dir().join(format!("dexrefresh-missing-{}.csv", Uuid::now_v7())),
            3,
        );
        let ctx = PipelineContext::child_of(&CancellationToken::new());
        let err = source.read(&ctx).await.unwrap_err();
        assert!(matches!(err, DexError::Io { .. }));
    }

    #[tokio::test]
    async fn empty_file_yields_no_streams() {
        let tmp_dir = std::env::temp_dir().join(format!("dexrefresh-empty-{}", Uuid::now_v7()));
        let source = CsvRecordSource::new(tmp_dir.join("pokemons.csv"), 3);
        source.write(&[]).await.unwrap();

        let ctx = PipelineContext::child_of(&CancellationToken::new());
        assert!(source.read(&ctx).await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&tmp_dir);
    }
}
