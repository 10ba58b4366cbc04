//! Configuration loading and typed config structures for the Epithel
//! simulation.
//!
//! Configuration is a YAML document; every field is optional:
//!
//! ```yaml
//! scheduler:
//!   element: face
//!   seed: 7
//!   logfile: events.log
//! history:
//!   extra_cols:
//!     face: [area]
//!   path: out/history.json
//!   save_every: 50
//!   sample_interval: 1.0
//!   dt: 0.1
//! run:
//!   max_ticks: 200
//!   record_every: 1
//! logging:
//!   level: info
//! ```
//!
//! `EPITHEL_LOG` overrides `logging.level`.

use std::path::{Path, PathBuf};

use epithel_behaviors::{BehaviorError, BehaviorRegistry, EventManager};
use epithel_history::{
    ExtraColumns, History, HistoryError, HistoryOptions, HistoryStore, HistoryWarning,
    SegmentOptions, SegmentedHistory,
};
use epithel_types::Tissue;
use serde::Deserialize;
use tracing::info;

/// Environment variable overriding `logging.level`.
pub const LOG_ENV: &str = "EPITHEL_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Behavior scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// History store settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Tick loop bounds and record cadence.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `EPITHEL_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.logging.apply_env_override();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_override();
        Ok(config)
    }
}

/// Behavior scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Element kind the scheduler works on, used in the event log header.
    #[serde(default = "default_element")]
    pub element: String,

    /// Seed of the tick-transition shuffle. Unset draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Event log file. Unset logs through `tracing` only.
    #[serde(default)]
    pub logfile: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            element: default_element(),
            seed: None,
            logfile: None,
        }
    }
}

impl SchedulerConfig {
    /// Build an event manager over `registry` with these settings.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError::Sink`] if the log file cannot be opened.
    pub fn build_manager<T>(
        &self,
        registry: BehaviorRegistry<T>,
    ) -> Result<EventManager<T>, BehaviorError> {
        let mut manager = EventManager::new(self.element.clone(), registry);
        if let Some(seed) = self.seed {
            manager = manager.seeded(seed);
        }
        if let Some(logfile) = &self.logfile {
            manager = manager.with_logfile(logfile)?;
        }
        Ok(manager)
    }
}

/// History store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryConfig {
    /// Columns to track beyond the defaults, per element kind.
    #[serde(default)]
    pub extra_cols: ExtraColumns,

    /// Manifest path of a segmented history.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Snapshots per shard. When set, the segmented store is used.
    #[serde(default)]
    pub save_every: Option<usize>,

    /// Simulated time between stored snapshots.
    #[serde(default)]
    pub sample_interval: Option<f64>,

    /// Simulated time between record calls.
    #[serde(default = "default_dt")]
    pub dt: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            extra_cols: ExtraColumns::new(),
            path: None,
            save_every: None,
            sample_interval: None,
            dt: default_dt(),
        }
    }
}

impl HistoryConfig {
    /// Return the options shared by both history variants.
    pub fn options(&self) -> HistoryOptions {
        HistoryOptions {
            extra_cols: self.extra_cols.clone(),
            sample_interval: self.sample_interval,
            dt: self.dt,
        }
    }

    /// Return the segment options, or `None` for an in-memory history.
    pub fn segment_options(&self) -> Option<SegmentOptions> {
        self.save_every.map(|save_every| SegmentOptions {
            path: self.path.clone(),
            save_every,
        })
    }

    /// Create the configured history store bound to `tissue`.
    ///
    /// Returns the store and the warnings raised while creating it.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the initial snapshot or the manifest
    /// cannot be written.
    pub fn build_store(
        &self,
        tissue: &Tissue,
    ) -> Result<(Box<dyn HistoryStore>, Vec<HistoryWarning>), HistoryError> {
        let options = self.options();
        if let Some(segment) = self.segment_options() {
            let history = SegmentedHistory::new(tissue, &options, &segment)?;
            let warnings = history.warnings().to_vec();
            info!(manifest = %history.path().display(), "Using segmented history");
            return Ok((Box::new(history), warnings));
        }
        let history = History::new(tissue, &options)?;
        let warnings = history.warnings().to_vec();
        info!("Using in-memory history");
        Ok((Box::new(history), warnings))
    }
}

/// Tick loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Stop after this many ticks.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Record history every N ticks. 0 disables recording.
    #[serde(default = "default_record_every")]
    pub record_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            record_every: default_record_every(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error, or any
    /// `tracing-subscriber` `EnvFilter` expression).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Override the level with `EPITHEL_LOG` when set.
    pub fn apply_env_override(&mut self) {
        self.apply_override(std::env::var(LOG_ENV).ok());
    }

    /// Override the level with `value` when it is non-empty.
    pub fn apply_override(&mut self, value: Option<String>) {
        if let Some(level) = value.filter(|level| !level.trim().is_empty()) {
            self.level = level;
        }
    }
}

// ---------------------------------------------------------------------------

fn default_element() -> String {
    "face".to_owned()
}

const fn default_dt() -> f64 {
    1.0
}

const fn default_max_ticks() -> u64 {
    100
}

const fn default_record_every() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}
