//! Fan-out/fan-in: a fixed pool of enrichment workers over the merged stream.
//!
//! Every worker pulls creatures from the shared merged stream, resolves each
//! ability reference through the fetcher and pushes the enriched creature to
//! one shared result stream. The first failure is pushed to the shared error
//! stream and cancels the pipeline, so sibling workers stop at their next
//! handoff instead of producing into streams nobody will read.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use dexrefresh_shared::{
    AbilityFetcher, Creature, DexError, HANDOFF_CAPACITY, PipelineContext, PipelineError,
};

use crate::merge::MergedStream;

/// The two fan-in streams of the pool.
#[derive(Debug)]
pub struct PoolStreams {
    /// Enriched creatures, in completion order.
    pub results: mpsc::Receiver<Creature>,
    /// Failures; the first one received is the run's error.
    pub errors: mpsc::Receiver<PipelineError>,
}

/// Start `workers` enrichment workers and their supervisor.
///
/// The supervisor waits for every worker, then closes the result stream and
/// after it the error stream.
pub fn spawn_pool(
    merged: MergedStream,
    fetcher: Arc<dyn AbilityFetcher>,
    workers: usize,
    ctx: &PipelineContext,
) -> PoolStreams {
    let workers = workers.max(1);
    let (results_tx, results_rx) = mpsc::channel(HANDOFF_CAPACITY);
    // One slot per worker plus the supervisor: error pushes never wait.
    let (errors_tx, errors_rx) = mpsc::channel(workers + 1);

    let mut pool = JoinSet::new();
    for id in 0..workers {
        pool.spawn(run_worker(
            id,
            merged.clone(),
            Arc::clone(&fetcher),
            results_tx.clone(),
            errors_tx.clone(),
            ctx.clone(),
        ));
    }
    drop(merged);

    let sup_ctx = ctx.clone();
    ctx.spawn(async move {
        let mut enriched = 0;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(n) => enriched += n,
                Err(e) => {
                    warn!(error = %e, "enrichment worker failed");
                    let _ = errors_tx
                        .send(PipelineError::Fetch(DexError::Task(format!(
                            "enrichment worker: {e}"
                        ))))
                        .await;
                    sup_ctx.cancel();
                }
            }
        }
        drop(results_tx);
        drop(errors_tx);
        debug!(workers, enriched, "enrichment pool drained");
    });

    PoolStreams {
        results: results_rx,
        errors: errors_rx,
    }
}

async fn run_worker(
    id: usize,
    merged: MergedStream,
    fetcher: Arc<dyn AbilityFetcher>,
    results: mpsc::Sender<Creature>,
    errors: mpsc::Sender<PipelineError>,
    ctx: PipelineContext,
) -> usize {
    let mut enriched = 0;

    loop {
        let item = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => break,
            item = merged.recv() => match item {
                Ok(item) => item,
                Err(_) => break,
            },
        };

        let outcome = match item {
            Ok(creature) => enrich(creature, fetcher.as_ref(), &ctx).await,
            Err(e) => Err(PipelineError::Read(e)),
        };

        match outcome {
            Ok(creature) => {
                if !ctx.handoff(&results, creature).await {
                    break;
                }
                enriched += 1;
            }
            Err(PipelineError::Cancelled) => break,
            Err(err) => {
                warn!(worker = id, stage = err.stage(), error = %err, "worker stopping");
                let _ = errors.send(err).await;
                ctx.cancel();
                break;
            }
        }
    }

    debug!(worker = id, enriched, "worker finished");
    enriched
}

/// Resolve every ability reference of `creature`, concatenating effects in
/// reference order.
async fn enrich(
    mut creature: Creature,
    fetcher: &dyn AbilityFetcher,
    ctx: &PipelineContext,
) -> Result<Creature, PipelineError> {
    let mut effects = Vec::new();

    for reference in creature.ability_refs() {
        let ability = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => return Err(PipelineError::Cancelled),
            fetched = fetcher.fetch_ability(reference) => fetched.map_err(|e| {
                warn!(creature = creature.id, reference, error = %e, "ability fetch failed");
                PipelineError::Fetch(e)
            })?,
        };
        effects.extend(ability.effects().map(String::from));
    }

    creature.effect_entries = effects;
    Ok(creature)
}
