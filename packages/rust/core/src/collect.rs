//! Collector: reconcile the pool's result and error streams into one outcome.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use dexrefresh_shared::{Creature, PipelineContext, PipelineError};

use crate::pool::PoolStreams;
use crate::progress::RefreshProgress;

/// Drain the pool into a complete collection or a single error.
///
/// An error (or caller cancellation) wins immediately: the pipeline is
/// cancelled and everything gathered so far is discarded. Once the result
/// stream closes the error stream is drained too, since a failure may have
/// been queued just before the last worker exited.
pub async fn collect(
    mut streams: PoolStreams,
    ctx: &PipelineContext,
    caller: &CancellationToken,
    progress: &dyn RefreshProgress,
) -> Result<Vec<Creature>, PipelineError> {
    let mut creatures = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = caller.cancelled() => {
                ctx.cancel();
                return Err(PipelineError::Cancelled);
            }
            Some(err) = streams.errors.recv() => {
                debug!(discarded = creatures.len(), "collector observed first error");
                ctx.cancel();
                return Err(err);
            }
            received = streams.results.recv() => match received {
                Some(creature) => {
                    creatures.push(creature);
                    progress.creature_collected(creatures.len());
                }
                None => break,
            },
        }
    }

    if let Some(err) = streams.errors.recv().await {
        ctx.cancel();
        return Err(err);
    }

    debug!(collected = creatures.len(), "result stream closed");
    Ok(creatures)
}
