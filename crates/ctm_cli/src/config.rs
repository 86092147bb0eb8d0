//! Driver configuration: loaded from TOML, overridden by CLI flags,
//! validated into [`RunConfig`] (§4.9, §6).

use serde::Deserialize;

use crate::error::CliError;

/// Mirrors the on-disk TOML shape exactly; every field is optional so a
/// partial file plus CLI overrides can still produce a complete [`RunConfig`].
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub n_states: Option<u32>,
    pub max_runtime_steps: Option<u64>,
    pub use_reduced_enumeration: Option<bool>,
    pub blank_symbol: Option<u8>,
    pub checkpoint_interval: Option<u64>,
    pub checkpoint_path: Option<String>,
    pub num_machines_to_run: Option<u128>,
    pub save_raw_counts: Option<bool>,
    pub num_processes: Option<usize>,
    pub batch_size: Option<u128>,
    pub output_path: Option<String>,
    pub log_level: Option<String>,
}

impl RawConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CliError> {
        toml::from_str(text).map_err(|e| CliError::Configuration(e.to_string()))
    }

    /// Apply CLI overrides on top of a loaded (or default) raw config. Each
    /// `Some` overlay wins; fields left `None` keep whatever the file set.
    pub fn merge_overrides(mut self, overrides: RawConfig) -> Self {
        macro_rules! overlay {
            ($field:ident) => {
                if overrides.$field.is_some() {
                    self.$field = overrides.$field;
                }
            };
        }
        overlay!(n_states);
        overlay!(max_runtime_steps);
        overlay!(use_reduced_enumeration);
        overlay!(blank_symbol);
        overlay!(checkpoint_interval);
        overlay!(checkpoint_path);
        overlay!(num_machines_to_run);
        overlay!(save_raw_counts);
        overlay!(num_processes);
        overlay!(batch_size);
        overlay!(output_path);
        overlay!(log_level);
        self
    }
}

/// The validated, in-memory configuration a run actually executes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub n_states: u32,
    pub max_runtime_steps: u64,
    pub use_reduced_enumeration: bool,
    pub blank_symbol: u8,
    pub checkpoint_interval: u64,
    pub checkpoint_path: String,
    pub num_machines_to_run: Option<u128>,
    pub save_raw_counts: bool,
    pub num_processes: usize,
    pub batch_size: u128,
    pub output_path: String,
    pub log_level: String,
}

impl RunConfig {
    pub fn validate(raw: RawConfig) -> Result<Self, CliError> {
        let n_states = raw
            .n_states
            .ok_or_else(|| CliError::Configuration("n_states is required".into()))?;
        if n_states == 0 {
            return Err(CliError::Configuration(
                "n_states must be positive".into(),
            ));
        }

        let max_runtime_steps = raw.max_runtime_steps.ok_or_else(|| {
            CliError::Configuration("max_runtime_steps is required".into())
        })?;
        if max_runtime_steps == 0 {
            return Err(CliError::Configuration(
                "max_runtime_steps must be positive".into(),
            ));
        }

        let blank_symbol = raw.blank_symbol.unwrap_or(0);
        if blank_symbol > 1 {
            return Err(CliError::Configuration(
                "blank_symbol must be 0 or 1".into(),
            ));
        }

        let batch_size = raw.batch_size.unwrap_or(10_000);
        if batch_size == 0 {
            return Err(CliError::Configuration("batch_size must be positive".into()));
        }

        if let Some(0) = raw.num_machines_to_run {
            return Err(CliError::Configuration(
                "num_machines_to_run must be positive when given".into(),
            ));
        }

        let log_level = raw.log_level.unwrap_or_else(|| "info".to_string());
        if !["error", "warn", "info", "debug", "trace"].contains(&log_level.as_str()) {
            return Err(CliError::Configuration(format!(
                "log_level {log_level:?} is not one of error/warn/info/debug/trace"
            )));
        }

        Ok(Self {
            n_states,
            max_runtime_steps,
            use_reduced_enumeration: raw.use_reduced_enumeration.unwrap_or(false),
            blank_symbol,
            checkpoint_interval: raw.checkpoint_interval.unwrap_or(0),
            checkpoint_path: raw
                .checkpoint_path
                .unwrap_or_else(|| "ctm.checkpoint".to_string()),
            num_machines_to_run: raw.num_machines_to_run,
            save_raw_counts: raw.save_raw_counts.unwrap_or(false),
            num_processes: raw.num_processes.unwrap_or(0),
            batch_size,
            output_path: raw
                .output_path
                .unwrap_or_else(|| "distribution.json".to_string()),
            log_level,
        })
    }

    /// `0` means "use all available cores".
    pub fn resolved_num_processes(&self) -> usize {
        if self.num_processes == 0 {
            num_cpus::get()
        } else {
            self.num_processes
        }
    }
}
