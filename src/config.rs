//! Configuration
//!
//! Two separate structs, mirroring the split between process-wide settings
//! and one-shot operation parameters:
//!
//! - [`RuntimeConfig`]: process-wide defaults (worker-pool sizing, logging,
//!   the data directory model artifacts are written under). Loaded
//!   hierarchically from `config.toml` -> `config.local.toml` -> environment.
//! - [`Hyperparams`]: per-model fit-time settings, constructed programmatically
//!   by the `fit()` caller as part of the Fit API payload. It shares the same
//!   `serde` derives so it round-trips through TOML/JSON for tooling, but it
//!   is never read from `config.toml`.
//!
//! ```toml
//! # config.toml
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [worker_pool]
//! num_threads = 0
//!
//! [persistence]
//! data_dir = "./data"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! RELFEAT_LOGGING__LEVEL=debug
//! RELFEAT_WORKER_POOL__NUM_THREADS=4
//! ```

use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::aggregation::Aggregation;
use crate::loss::DEFAULT_LAMBDA;

/// Process-wide settings, independent of any particular model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub worker_pool: WorkerPoolConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Log level/format for the `tracing-subscriber` initialized by the CLI stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Default sizing for [`crate::worker_pool::WorkerPool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// 0 = `num_cpus::get()`.
    #[serde(default)]
    pub num_threads: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        WorkerPoolConfig { num_threads: 0 }
    }
}

impl WorkerPoolConfig {
    #[must_use]
    pub fn resolved_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }
}

/// Where model artifacts are written/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            logging: LoggingConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Merges `config.toml` -> `config.local.toml` -> `RELFEAT_*` env vars.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("RELFEAT_").split("__"))
            .join(figment::providers::Serialized::defaults(
                RuntimeConfig::default(),
            ))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELFEAT_").split("__"))
            .join(figment::providers::Serialized::defaults(
                RuntimeConfig::default(),
            ))
            .extract()
    }
}

/// Per-model fit-time hyperparameters (C8/C9). Constructed programmatically
/// by the caller of `fit()`, not read from process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperparams {
    /// Number of boosting rounds (trees).
    pub num_subfeatures: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum matches required on each side of an accepted split.
    pub min_num_samples: usize,
    /// Minimum split-gain reduction to accept a candidate split.
    pub min_reduction: f64,
    /// L2 regularization penalty on leaf weights.
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Learning-rate shrinkage applied to each tree's update rate.
    pub shrinkage: f64,
    /// Row-subsampling rate per round (`0.0..=1.0`).
    pub sampling_factor: f64,
    /// Candidate (attribute, aggregation) pairs sampled per tree node.
    pub num_features_per_node: usize,
    /// Quantile bucket count for the numerical binner.
    pub num_bins: usize,
    /// Name of the loss function, resolved via [`crate::loss::by_name`].
    pub loss: String,
    /// Whether timestamp windowing is enabled for matching.
    pub use_timestamps: bool,
    /// RNG seed for row subsampling and candidate subsetting. Fitting twice
    /// with the same seed reproduces a bit-identical ensemble, regardless of
    /// the worker-pool thread count used either time.
    #[serde(default)]
    pub seed: u64,
    /// Allow-listed aggregation kinds tried against numerical/discrete
    /// peripheral columns. The per-row match count and the per-column
    /// majority category/word-set candidates are always produced regardless
    /// of this list.
    #[serde(default = "default_aggregations")]
    pub aggregations: Vec<Aggregation>,
}

fn default_lambda() -> f64 {
    DEFAULT_LAMBDA
}

fn default_aggregations() -> Vec<Aggregation> {
    vec![
        Aggregation::Sum,
        Aggregation::Avg,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Stddev,
        Aggregation::Median,
    ]
}

impl Default for Hyperparams {
    fn default() -> Self {
        Hyperparams {
            num_subfeatures: 10,
            max_depth: 3,
            min_num_samples: 10,
            min_reduction: 0.0,
            lambda: DEFAULT_LAMBDA,
            shrinkage: 0.1,
            sampling_factor: 1.0,
            num_features_per_node: 50,
            num_bins: crate::binning::numerical::DEFAULT_NUM_BINS,
            loss: "square_loss".to_string(),
            use_timestamps: true,
            seed: 0,
            aggregations: default_aggregations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_config_round_trips_through_toml() {
        let config = RuntimeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: RuntimeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.logging.level, config.logging.level);
        assert_eq!(
            parsed.worker_pool.num_threads,
            config.worker_pool.num_threads
        );
    }

    #[test]
    fn zero_threads_resolves_to_cpu_count() {
        let config = WorkerPoolConfig { num_threads: 0 };
        assert!(config.resolved_num_threads() >= 1);
    }

    #[test]
    fn hyperparams_default_has_sane_loss_name() {
        let hp = Hyperparams::default();
        assert!(crate::loss::by_name(&hp.loss).is_ok());
    }
}
