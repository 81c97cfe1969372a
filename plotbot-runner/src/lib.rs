//! Plotbot Runner: acquisition orchestration on top of `plotbot-core`.
//!
//! This crate provides:
//! - TOML configuration (`PlotbotConfig`)
//! - Raw data sources: CSV directory, deterministic synthetic, in-memory
//! - The acquisition orchestrator (cache / import / download decisions)
//! - Cross-instrument field alignment over a session's cached data

pub mod alignment;
pub mod config;
pub mod orchestrator;
pub mod source;

pub use alignment::{align_field, AlignedField, AlignmentError, FieldRef};
pub use config::{AlignmentConfig, CompressionKind, ConfigError, PlotbotConfig, RemoteKind};
pub use orchestrator::{
    widen_to_granularity, AcquireError, AcquireReport, AcquisitionAction, KeyOutcome,
    Orchestrator, PopulatedSave,
};
pub use source::{CsvDirectorySource, DataSource, MemorySource, SourceError, SyntheticSource};
