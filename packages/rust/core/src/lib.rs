//! Concurrent refresh pipeline for the creature cache.
//!
//! Segment streams from a [`RecordSource`](dexrefresh_shared::RecordSource)
//! are merged into one stream, enriched by a fixed worker pool and collected
//! into a single outcome before anything is handed to the cache sink.

pub mod collect;
pub mod merge;
pub mod pool;
pub mod progress;
pub mod refresher;

#[cfg(test)]
mod testing;

pub use collect::collect;
pub use merge::{MergedStream, merge};
pub use pool::{PoolStreams, spawn_pool};
pub use progress::{RefreshProgress, SilentProgress};
pub use refresher::{RefreshReport, Refresher};
