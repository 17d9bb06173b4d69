//! Shared types, error model, configuration, and collaborator ports for dexrefresh.
//!
//! This crate is the foundation depended on by all other dexrefresh crates.
//! It provides:
//! - [`DexError`] and [`PipelineError`]: the error types
//! - Domain types ([`Creature`], [`Ability`])
//! - Configuration ([`AppConfig`], [`RefreshConfig`], config loading)
//! - Collaborator traits ([`RecordSource`], [`AbilityFetcher`], [`CacheSink`])

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, FetchConfig, PipelineConfig, RefreshConfig, SourceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DexError, PipelineError, Result};
pub use ports::{
    AbilityFetcher, CacheSink, EntityItem, HANDOFF_CAPACITY, PipelineContext, RecordSource,
    SegmentStream,
};
pub use types::{ABILITY_DELIMITER, Ability, Creature, EffectEntry, NamedResource, RECORD_HEADER};
