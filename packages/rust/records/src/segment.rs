//! Segmented reader: splits a record table into contiguous index ranges and
//! parses each range on its own task.

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use dexrefresh_shared::{HANDOFF_CAPACITY, PipelineContext, SegmentStream};

use crate::table::{RawRecord, RecordTable, parse_creature};

/// Compute the segment ranges for `total` rows and `workers` tasks.
///
/// Yields `workers` ranges when there are at least that many rows, one range
/// covering everything when there are fewer, and nothing for an empty table.
/// Every range but the last has `total / workers` rows; the last absorbs the
/// remainder.
pub fn segment_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.max(1);
    if total < workers {
        return vec![0..total];
    }

    let part = total / workers;
    (0..workers)
        .map(|i| {
            let start = i * part;
            let end = if i + 1 == workers { total } else { start + part };
            start..end
        })
        .collect()
}

/// Start one parsing task per segment and return their streams in segment order.
///
/// Each task pushes creatures in row order. A row that fails to parse is pushed
/// as the stream's last item and the task stops, closing the stream.
pub fn spawn_segments(
    table: RecordTable,
    workers: usize,
    ctx: &PipelineContext,
) -> Vec<SegmentStream> {
    let ranges = segment_ranges(table.len(), workers);
    let rows: Arc<[RawRecord]> = table.rows.into();

    ranges
        .into_iter()
        .map(|range| {
            let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
            let rows = Arc::clone(&rows);
            let task_ctx = ctx.clone();
            let task_range = range.clone();

            ctx.spawn(async move {
                debug!(start = task_range.start, end = task_range.end, "parsing segment");

                for record in &rows[task_range.clone()] {
                    let item = parse_creature(record);
                    let failed = item.is_err();

                    if !task_ctx.handoff(&tx, item).await {
                        debug!(start = task_range.start, "segment stopped early");
                        return;
                    }
                    if failed {
                        warn!(line = record.line, "segment aborted on unparsable row");
                        return;
                    }
                }

                debug!(start = task_range.start, end = task_range.end, "segment exhausted");
            });

            SegmentStream {
                range,
                entities: rx,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;
    use tokio_util::sync::CancellationToken;

    fn table_with(rows: usize) -> RecordTable {
        let mut content = String::from("id,name,height,weight,flat_abilities\n");
        for i in 0..rows {
            content.push_str(&format!("{i},mon{i},{},{},\n", i + 1, i * 10));
        }
        parse_table(&content).unwrap()
    }

    #[test]
    fn five_rows_three_workers() {
        assert_eq!(segment_ranges(5, 3), vec![0..1, 1..2, 2..5]);
    }

    #[test]
    fn two_rows_single_segment() {
        assert_eq!(segment_ranges(2, 3), vec![0..2]);
    }

    #[test]
    fn zero_rows_no_segments() {
        assert!(segment_ranges(0, 3).is_empty());
    }

    #[test]
    fn exact_multiple_splits_evenly() {
        assert_eq!(segment_ranges(9, 3), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn ranges_are_disjoint_and_cover_all_rows() {
        for workers in 1..=5 {
            for total in 0..40 {
                let ranges = segment_ranges(total, workers);
                let expected = if total == 0 {
                    0
                } else if total < workers {
                    1
                } else {
                    workers
                };
                assert_eq!(ranges.len(), expected, "total={total} workers={workers}");

                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    assert!(r.end >= r.start);
                    next = r.end;
                }
                assert_eq!(next, total);

                if total >= workers {
                    let last = ranges.last().unwrap();
                    assert_eq!(last.len(), total / workers + total % workers);
                }
            }
        }
    }

    #[tokio::test]
    async fn segments_stream_rows_in_order() {
        let ctx = PipelineContext::child_of(&CancellationToken::new());
        let streams = spawn_segments(table_with(5), 3, &ctx);
        assert_eq!(streams.len(), 3);

        let mut seen = Vec::new();
        for mut s in streams {
            let mut ids = Vec::new();
            while let Some(item) = s.entities.recv().await {
                ids.push(item.unwrap().id as usize);
            }
            assert_eq!(ids, s.range.clone().collect::<Vec<_>>());
            seen.extend(ids);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn parse_error_ends_only_its_segment() {
        let content = "id,name,height,weight,flat_abilities
1,a,1,1,
2,b,1,1,
3,c,x,1,
4,d,1,1,
5,e,1,1,
6,f,1,1,
";
        let ctx = PipelineContext::child_of(&CancellationToken::new());
        let mut streams = spawn_segments(parse_table(content).unwrap(), 3, &ctx);

        // Segment [2,4) hits the bad row first and closes right after it.
        let mut middle = streams.remove(1);
        let first = middle.entities.recv().await.unwrap();
        assert!(first.is_err());
        assert!(middle.entities.recv().await.is_none());

        for mut s in streams {
            let mut count = 0;
            while let Some(item) = s.entities.recv().await {
                assert!(item.is_ok());
                count += 1;
            }
            assert_eq!(count, 2);
        }
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_stops_blocked_segment() {
        let ctx = PipelineContext::child_of(&CancellationToken::new());
        let streams = spawn_segments(table_with(30), 3, &ctx);

        // Nobody drains the streams; shutdown must still return.
        ctx.shutdown().await;
        drop(streams);
    }
}
