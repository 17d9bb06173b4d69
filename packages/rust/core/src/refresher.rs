//! End-to-end refresh: read → merge → enrich → collect → save.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use dexrefresh_shared::{
    AbilityFetcher, CacheSink, Creature, PipelineContext, PipelineError, RecordSource,
    RefreshConfig,
};

use crate::collect::collect;
use crate::merge::merge;
use crate::pool::spawn_pool;
use crate::progress::{RefreshProgress, SilentProgress};

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Number of creatures saved.
    pub creatures: usize,
    /// Number of segment streams the source produced.
    pub segments: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Runs refreshes against injected collaborators.
pub struct Refresher {
    source: Arc<dyn RecordSource>,
    fetcher: Arc<dyn AbilityFetcher>,
    sink: Arc<dyn CacheSink>,
    config: RefreshConfig,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn RecordSource>,
        fetcher: Arc<dyn AbilityFetcher>,
        sink: Arc<dyn CacheSink>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            source,
            fetcher,
            sink,
            config,
        }
    }

    /// Refresh without progress reporting.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<RefreshReport, PipelineError> {
        self.refresh_with_progress(cancel, &SilentProgress).await
    }

    /// Run one refresh under `cancel`.
    ///
    /// Nothing is saved unless every creature was read and enriched. No
    /// pipeline task outlives this call, whatever the outcome.
    #[instrument(skip_all, fields(workers = self.config.worker_count))]
    pub async fn refresh_with_progress(
        &self,
        cancel: &CancellationToken,
        progress: &dyn RefreshProgress,
    ) -> Result<RefreshReport, PipelineError> {
        let start = Instant::now();
        let ctx = PipelineContext::child_of(cancel);

        let outcome = self.enrich_all(&ctx, cancel, progress).await;
        ctx.shutdown().await;

        let (creatures, segments) = outcome.inspect_err(|e| {
            warn!(stage = e.stage(), error = %e, "refresh aborted");
        })?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        progress.phase("Saving creatures");
        self.sink
            .save(cancel, &creatures)
            .await
            .map_err(PipelineError::Save)
            .inspect_err(|e| warn!(error = %e, "refresh aborted"))?;

        let report = RefreshReport {
            creatures: creatures.len(),
            segments,
            elapsed: start.elapsed(),
        };

        info!(
            creatures = report.creatures,
            segments = report.segments,
            elapsed_ms = report.elapsed.as_millis(),
            "refresh complete"
        );
        progress.done(&report);

        Ok(report)
    }

    async fn enrich_all(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
        progress: &dyn RefreshProgress,
    ) -> Result<(Vec<Creature>, usize), PipelineError> {
        progress.phase("Reading records");
        let segments = self.source.read(ctx).await.map_err(PipelineError::Read)?;
        let segment_count = segments.len();

        progress.phase("Enriching abilities");
        let merged = merge(segments, ctx);
        let streams = spawn_pool(
            merged,
            Arc::clone(&self.fetcher),
            self.config.worker_count,
            ctx,
        );

        let creatures = collect(streams, ctx, cancel, progress).await?;
        Ok((creatures, segment_count))
    }
}
