//! Collaborator capabilities consumed by the refresh pipeline, plus the
//! per-run context every pipeline task is spawned under.

use std::future::Future;
use std::ops::Range;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::types::{Ability, Creature};

/// Capacity of every entity handoff stream. Tokio channels cannot be
/// zero-sized, so a single slot is the closest thing to a rendezvous.
pub const HANDOFF_CAPACITY: usize = 1;

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// An item on a segment stream. A parse failure is delivered in-band as the
/// final item before the stream closes.
pub type EntityItem = Result<Creature>;

/// One parsing task's output stream and the rows it covers.
#[derive(Debug)]
pub struct SegmentStream {
    /// Half-open range of data-row indices (header excluded).
    pub range: Range<usize>,
    /// Parsed creatures in row order.
    pub entities: mpsc::Receiver<EntityItem>,
}

// ---------------------------------------------------------------------------
// PipelineContext
// ---------------------------------------------------------------------------

/// Cancellation and task tracking shared by every task of one refresh run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl PipelineContext {
    /// Create a context whose token is a child of `parent`, so cancelling the
    /// caller's token stops the pipeline but not the other way around.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tracker: TaskTracker::new(),
        }
    }

    /// The pipeline-wide cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop every task at its next handoff.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawn a pipeline task on the run's tracker.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Push `item` into `tx` unless the pipeline is cancelled first.
    ///
    /// Returns `false` when the item was not delivered (cancelled, or the
    /// receiving side is gone); the caller should stop producing.
    pub async fn handoff<T>(&self, tx: &mpsc::Sender<T>, item: T) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = tx.send(item) => sent.is_ok(),
        }
    }

    /// Cancel the run and wait until every tracked task has exited.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Produces the segmented entity streams for a run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load the record table and start one parsing task per segment.
    async fn read(&self, ctx: &PipelineContext) -> Result<Vec<SegmentStream>>;
}

/// Resolves an ability reference into its effect descriptions.
///
/// Called concurrently from every enrichment worker.
#[async_trait]
pub trait AbilityFetcher: Send + Sync {
    async fn fetch_ability(&self, reference: &str) -> Result<Ability>;
}

/// Persists a complete, enriched collection.
#[async_trait]
pub trait CacheSink: Send + Sync {
    async fn save(&self, cancel: &CancellationToken, creatures: &[Creature]) -> Result<()>;
}
