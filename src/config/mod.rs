//! Typed configuration from a TOML file and environment variables.
//!
//! File values override defaults, environment values override the file.
//! Everything is validated once, up front; an engine never starts with a
//! configuration it cannot honor.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Queue capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Load monitor tick used when nothing else is configured.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(400);

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Engine settings. Immutable once handed to `Engine::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on concurrent workers.
    pub max_workers: usize,
    /// Workers spawned by `start`. `1 <= initial_workers <= max_workers`.
    pub initial_workers: usize,
    /// Pending tasks the queue holds before producers block.
    pub queue_capacity: usize,
    /// Deadline for tasks that don't carry their own.
    pub task_deadline: Option<Duration>,
    pub monitor_interval: Duration,
    /// Pin workers to cores. Off means threads float.
    pub pin_workers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(2 * num_cpus::get().max(1), DEFAULT_QUEUE_CAPACITY)
    }
}

impl EngineConfig {
    /// Configuration with the given bounds. Initial workers default to one
    /// per CPU, capped at `max_workers`.
    pub fn new(max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            max_workers,
            initial_workers: num_cpus::get().clamp(1, max_workers.max(1)),
            queue_capacity,
            task_deadline: None,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            pin_workers: true,
        }
    }

    pub fn initial_workers(mut self, n: usize) -> Self {
        self.initial_workers = n;
        self
    }

    pub fn task_deadline(mut self, deadline: Duration) -> Self {
        self.task_deadline = Some(deadline);
        self
    }

    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.pin_workers = pin;
        self
    }

    /// Check the bounds `max_workers >= initial_workers >= 1` and a
    /// non-empty queue.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::InvalidConfig("max_workers must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be > 0".into()));
        }
        if self.initial_workers == 0 || self.initial_workers > self.max_workers {
            return Err(Error::InvalidConfig(format!(
                "initial_workers must be in 1..={}, got {}",
                self.max_workers, self.initial_workers
            )));
        }
        if self.monitor_interval.is_zero() {
            return Err(Error::InvalidConfig("monitor_interval must be > 0".into()));
        }
        if self.task_deadline.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidConfig("task_deadline must be > 0".into()));
        }
        Ok(())
    }

    /// Load a TOML file with an `[engine]` table on top of the defaults.
    ///
    /// Unknown keys are ignored. Malformed values are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))?;

        let mut config = Self::default();
        file.engine.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document that [`EngineConfig::load`] accepts.
    pub fn to_toml(&self) -> Result<String> {
        let file = ConfigFile {
            engine: EngineOverrides::from(self),
        };
        toml::to_string_pretty(&file).map_err(|e| Error::Other(format!("serialize config: {e}")))
    }
}

/// Top-level TOML wrapper.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineOverrides,
}

/// Optional engine settings from one source (file or environment).
#[derive(Debug, Default, Serialize, Deserialize)]
struct EngineOverrides {
    max_workers: Option<usize>,
    initial_workers: Option<usize>,
    queue_capacity: Option<usize>,
    task_deadline_ms: Option<u64>,
    monitor_interval_ms: Option<u64>,
    pin_workers: Option<bool>,
}

impl EngineOverrides {
    fn apply(&self, config: &mut EngineConfig) {
        if let Some(n) = self.max_workers {
            config.max_workers = n;
            // An inherited initial count follows a lowered ceiling.
            if self.initial_workers.is_none() {
                config.initial_workers = config.initial_workers.clamp(1, n.max(1));
            }
        }
        if let Some(n) = self.initial_workers {
            config.initial_workers = n;
        }
        if let Some(n) = self.queue_capacity {
            config.queue_capacity = n;
        }
        if let Some(ms) = self.task_deadline_ms {
            config.task_deadline = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = self.monitor_interval_ms {
            config.monitor_interval = Duration::from_millis(ms);
        }
        if let Some(pin) = self.pin_workers {
            config.pin_workers = pin;
        }
    }

    fn from_env() -> Result<Self> {
        Ok(Self {
            max_workers: parsed_var("COREPOOL_MAX_WORKERS")?,
            initial_workers: parsed_var("COREPOOL_INITIAL_WORKERS")?,
            queue_capacity: parsed_var("COREPOOL_QUEUE_CAPACITY")?,
            task_deadline_ms: parsed_var("COREPOOL_TASK_DEADLINE_MS")?,
            monitor_interval_ms: parsed_var("COREPOOL_MONITOR_INTERVAL_MS")?,
            pin_workers: parsed_var("COREPOOL_PIN_WORKERS")?,
        })
    }
}

impl From<&EngineConfig> for EngineOverrides {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_workers: Some(config.max_workers),
            initial_workers: Some(config.initial_workers),
            queue_capacity: Some(config.queue_capacity),
            task_deadline_ms: config.task_deadline.map(|d| d.as_millis() as u64),
            monitor_interval_ms: Some(config.monitor_interval.as_millis() as u64),
            pin_workers: Some(config.pin_workers),
        }
    }
}

// ---------------------------------------------------------------------------
// Process configuration
// ---------------------------------------------------------------------------

/// Everything a process embedding the engine reads at startup.
#[derive(Debug)]
pub struct Config {
    pub engine: EngineConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load an optional TOML file, then apply environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut engine = match file {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        EngineOverrides::from_env()?.apply(&mut engine);
        engine.validate()?;

        Ok(Self {
            engine,
            otel_endpoint: optional_var("OTEL_ENDPOINT")?,
            log_level: optional_var("LOG_LEVEL")?.unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(Error::Config(format!(
            "environment variable {name} is set but empty"
        ))),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("environment variable {name}: {e}"))),
    }
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(name)?
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| Error::Config(format!("invalid value for {name} ({raw:?}): {e}")))
        })
        .transpose()
}
