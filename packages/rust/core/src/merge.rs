//! Fan-in: merge the segment streams into one multi-consumer stream.

use tokio::task::JoinSet;
use tracing::{debug, warn};

use dexrefresh_shared::{DexError, EntityItem, HANDOFF_CAPACITY, PipelineContext, SegmentStream};

/// The merged entity stream. Cloned once per enrichment worker.
pub type MergedStream = async_channel::Receiver<EntityItem>;

/// Relay every input into one shared output.
///
/// One forwarding task runs per input; a supervising task waits for all of
/// them and only then closes the output, so it closes exactly once and only
/// after every input is exhausted (or the pipeline is cancelled). Items from
/// different inputs interleave in no particular order.
pub fn merge(inputs: Vec<SegmentStream>, ctx: &PipelineContext) -> MergedStream {
    let (tx, rx) = async_channel::bounded(HANDOFF_CAPACITY);
    let inputs_len = inputs.len();

    let mut forwarders = JoinSet::new();
    for input in inputs {
        forwarders.spawn(forward(input, tx.clone(), ctx.clone()));
    }

    let sup_ctx = ctx.clone();
    ctx.spawn(async move {
        let mut relayed = 0;
        while let Some(joined) = forwarders.join_next().await {
            match joined {
                Ok(n) => relayed += n,
                Err(e) => {
                    warn!(error = %e, "segment forwarder failed");
                    let item = Err(DexError::Task(format!("segment forwarder: {e}")));
                    let _ = send(&tx, item, &sup_ctx).await;
                }
            }
        }
        tx.close();
        debug!(inputs = inputs_len, relayed, "merged stream closed");
    });

    rx
}

async fn forward(
    mut input: SegmentStream,
    out: async_channel::Sender<EntityItem>,
    ctx: PipelineContext,
) -> usize {
    let mut relayed = 0;
    loop {
        let item = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => break,
            item = input.entities.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };
        if !send(&out, item, &ctx).await {
            break;
        }
        relayed += 1;
    }
    debug!(start = input.range.start, end = input.range.end, relayed, "forwarder finished");
    relayed
}

async fn send(
    out: &async_channel::Sender<EntityItem>,
    item: EntityItem,
    ctx: &PipelineContext,
) -> bool {
    tokio::select! {
        biased;
        _ = ctx.token().cancelled() => false,
        sent = out.send(item) => sent.is_ok(),
    }
}
