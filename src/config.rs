use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StartStopConfig {
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LifecycleConfig {
    /// Deadline for every individual start call, in milliseconds
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// Deadline for every individual stop call, in milliseconds
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional file to write logs to instead of stderr
    pub file: Option<String>,
}

/// One simulated service in the managed list. Order in the file is start order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    pub name: String,

    /// Time the service takes to start, in milliseconds
    #[serde(default)]
    pub start_delay_ms: u64,

    /// Time the service takes to stop; one second more than start when unset
    pub stop_delay_ms: Option<u64>,

    #[serde(default)]
    pub fail_start: bool,

    #[serde(default)]
    pub fail_stop: bool,

    /// Abandon work as soon as the orchestrator gives up on the call
    #[serde(default = "default_cooperative")]
    pub cooperative: bool,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, start_delay_ms: u64) -> Self {
        Self {
            name: name.into(),
            start_delay_ms,
            stop_delay_ms: None,
            fail_start: false,
            fail_stop: false,
            cooperative: default_cooperative(),
        }
    }

    pub fn effective_stop_delay_ms(&self) -> u64 {
        self.stop_delay_ms
            .unwrap_or_else(|| self.start_delay_ms.saturating_add(1000))
    }
}

impl LifecycleConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: default_start_timeout_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl StartStopConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("startstop.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("lifecycle.start_timeout_ms", default_start_timeout_ms())?
            .set_default("lifecycle.stop_timeout_ms", default_stop_timeout_ms())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&path_str).required(false))
            // STARTSTOP_LIFECYCLE__STOP_TIMEOUT_MS=500
            .add_source(
                Environment::with_prefix("STARTSTOP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StartStopConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.start_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Start timeout must be greater than 0".to_string(),
            ));
        }

        if self.lifecycle.stop_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Stop timeout must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Message(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        if !LOG_FORMATS.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::Message(format!(
                "Unknown log format '{}'",
                self.logging.format
            )));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Message(
                    "Service name must not be empty".to_string(),
                ));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate service name '{}'",
                    service.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for StartStopConfig {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleConfig::default(),
            logging: LoggingConfig::default(),
            services: default_services(),
        }
    }
}

// Default value functions
fn default_start_timeout_ms() -> u64 {
    3000
}
fn default_stop_timeout_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_cooperative() -> bool {
    true
}
fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::new("A", 1000),
        ServiceConfig::new("B", 2000),
        ServiceConfig::new("C", 1000),
    ]
}
