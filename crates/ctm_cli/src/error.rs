//! Error taxonomy for the driver, checkpoint store, and CLI boundary (§7).
//!
//! Variants carry enough structure for call sites to match on kind; the
//! binary itself surfaces them through `anyhow::Context`-chained `Display`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("checkpoint at {path} is not a valid checkpoint: {source}")]
    CheckpointDecode {
        path: String,
        #[source]
        source: bincode::Error,
    },

    #[error("checkpoint at {path} could not be read or written: {source}")]
    CheckpointIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "checkpoint mismatch: run requested n_states={requested_n}, mode={requested_mode}, but checkpoint at {path} was recorded for n_states={saved_n}, mode={saved_mode}"
    )]
    CheckpointMismatch {
        path: String,
        requested_n: u32,
        requested_mode: String,
        saved_n: u32,
        saved_mode: String,
    },

    #[error("checkpoint format version {found} is not supported (expected {expected})")]
    CheckpointVersion { found: u32, expected: u32 },

    #[error("distribution file at {path} is malformed: {reason}")]
    DistributionFormat { path: String, reason: String },

    #[error("worker for batch [{start}, {end}) crashed twice; aborting run")]
    WorkerCrash { start: u128, end: u128 },

    #[error(transparent)]
    Core(#[from] ctm_core::error::CoreError),
}
