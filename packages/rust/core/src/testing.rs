//! In-memory collaborators for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dexrefresh_shared::{
    Ability, AbilityFetcher, CacheSink, Creature, DexError, EffectEntry, HANDOFF_CAPACITY,
    NamedResource, PipelineContext, RecordSource, Result, SegmentStream,
};

pub(crate) fn creature(id: u32, refs: &[&str]) -> Creature {
    Creature {
        id,
        name: format!("mon{id}"),
        height: id,
        weight: id * 10,
        flat_abilities: refs.join("|"),
        effect_entries: Vec::new(),
    }
}

/// A row of a fake segment: a creature or the message of a parse failure.
pub(crate) type FakeRow = std::result::Result<Creature, String>;

/// Spawn one producer task per segment, mirroring the real segmented reader.
pub(crate) fn fake_segments(segments: Vec<Vec<FakeRow>>, ctx: &PipelineContext) -> Vec<SegmentStream> {
    let mut start = 0;
    segments
        .into_iter()
        .map(|rows| {
            let range = start..start + rows.len();
            start = range.end;

            let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
            let task_ctx = ctx.clone();
            ctx.spawn(async move {
                for row in rows {
                    let failed = row.is_err();
                    let item = row.map_err(DexError::parse);
                    if !task_ctx.handoff(&tx, item).await || failed {
                        return;
                    }
                }
            });

            SegmentStream {
                range,
                entities: rx,
            }
        })
        .collect()
}

/// Record source serving fixed segments.
pub(crate) struct FakeSource {
    segments: Mutex<Option<Vec<Vec<FakeRow>>>>,
    fail: bool,
}

impl FakeSource {
    pub(crate) fn new(segments: Vec<Vec<FakeRow>>) -> Self {
        Self {
            segments: Mutex::new(Some(segments)),
            fail: false,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            segments: Mutex::new(None),
            fail: true,
        }
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn read(&self, ctx: &PipelineContext) -> Result<Vec<SegmentStream>> {
        if self.fail {
            return Err(DexError::io(
                "resources/pokemons.csv",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            ));
        }
        let segments = self.segments.lock().unwrap().take().unwrap_or_default();
        Ok(fake_segments(segments, ctx))
    }
}

/// Fetcher answering from a fixed table of effects.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    effects: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn with(mut self, reference: &str, effects: &[&str]) -> Self {
        self.effects.insert(
            reference.to_string(),
            effects.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    pub(crate) fn failing(mut self, reference: &str) -> Self {
        self.failing.insert(reference.to_string());
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AbilityFetcher for FakeFetcher {
    async fn fetch_ability(&self, reference: &str) -> Result<Ability> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(reference) {
            return Err(DexError::Network(format!("{reference}: HTTP 500")));
        }

        let effect_entries = self
            .effects
            .get(reference)
            .map(|effects| {
                effects
                    .iter()
                    .map(|effect| EffectEntry {
                        effect: effect.clone(),
                        short_effect: String::new(),
                        language: NamedResource::default(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Ability { effect_entries })
    }
}

/// Sink recording every saved collection.
#[derive(Default)]
pub(crate) struct RecordingSink {
    saves: Mutex<Vec<Vec<Creature>>>,
    fail: bool,
}

impl RecordingSink {
    pub(crate) fn failing() -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn saves(&self) -> Vec<Vec<Creature>> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheSink for RecordingSink {
    async fn save(&self, cancel: &CancellationToken, creatures: &[Creature]) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(DexError::Cancelled);
        }
        if self.fail {
            return Err(DexError::Storage("database is locked".into()));
        }
        self.saves.lock().unwrap().push(creatures.to_vec());
        Ok(())
    }
}
