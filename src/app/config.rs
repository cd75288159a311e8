use crate::storage::FailurePolicy;
use crate::transport::HttpEndpointConfig;
use crate::transport::http::default_client_id;
use crate::upload::{
    FailoverConfig, LogUploadConfig, RetryStrategy, TimeoutScope, UploadConfigError,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error(transparent)]
    Upload(#[from] UploadConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Collector endpoint URLs, tried in order on failover (comma separated)
    #[arg(
        long = "endpoint",
        env = "LOGSYNC_ENDPOINTS",
        value_delimiter = ',',
        default_value = "http://localhost:8080/v1/logs"
    )]
    pub endpoints: Vec<String>,

    /// Maximum bytes per uploaded block
    #[arg(long, env = "LOGSYNC_BATCH_VOLUME", default_value = "8192")]
    pub batch_volume: usize,

    /// Buffered bytes that trigger an upload
    #[arg(long, env = "LOGSYNC_VOLUME_THRESHOLD", default_value = "8192")]
    pub volume_threshold: usize,

    /// Buffered bytes at which the oldest records are evicted
    #[arg(long, env = "LOGSYNC_MAX_VOLUME", default_value = "1048576")]
    pub maximum_allowed_volume: usize,

    /// Seconds a block may stay unacknowledged
    #[arg(long, env = "LOGSYNC_UPLOAD_TIMEOUT_SECS", default_value = "120")]
    pub upload_timeout_secs: u64,

    /// Which in-flight blocks a delivery timeout fails
    #[arg(long, env = "LOGSYNC_TIMEOUT_SCOPE", default_value = "all-in-flight")]
    pub timeout_scope: TimeoutScope,

    /// What happens to records of a failed block
    #[arg(long, env = "LOGSYNC_FAILURE_POLICY", default_value = "drop")]
    pub failure_policy: FailurePolicy,

    /// Largest accepted record in bytes
    #[arg(long, env = "LOGSYNC_MAX_RECORD_SIZE")]
    pub max_record_size: Option<usize>,

    /// Backoff growth after failed deliveries
    #[arg(long, env = "LOGSYNC_RETRY_STRATEGY", default_value = "exponential-backoff")]
    pub retry_strategy: RetryStrategy,

    /// Base backoff delay in milliseconds
    #[arg(long, env = "LOGSYNC_RETRY_BASE_DELAY_MS", default_value = "1000")]
    pub retry_base_delay_ms: u64,

    /// Backoff cap in milliseconds
    #[arg(long, env = "LOGSYNC_RETRY_MAX_DELAY_MS", default_value = "300000")]
    pub retry_max_delay_ms: u64,

    /// Disable backoff jitter
    #[arg(long, env = "LOGSYNC_DISABLE_JITTER")]
    pub disable_jitter: bool,

    /// Interval of the background timeout sweep in milliseconds
    #[arg(long, env = "LOGSYNC_SWEEP_INTERVAL_MS", default_value = "1000")]
    pub sweep_interval_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "LOGSYNC_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "LOGSYNC_CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Gzip request bodies
    #[arg(long, env = "LOGSYNC_ENABLE_COMPRESSION")]
    pub enable_compression: bool,

    /// Client id sent with every request (defaults to the host name)
    #[arg(long, env = "LOGSYNC_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "LOGSYNC_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let upload = LogUploadConfig::default();
        let failover = FailoverConfig::default();

        Self {
            endpoints: vec!["http://localhost:8080/v1/logs".to_string()],
            batch_volume: upload.batch_volume,
            volume_threshold: upload.volume_threshold,
            maximum_allowed_volume: upload.maximum_allowed_volume,
            upload_timeout_secs: upload.upload_timeout.as_secs(),
            timeout_scope: upload.timeout_scope,
            failure_policy: FailurePolicy::default(),
            max_record_size: None,
            retry_strategy: failover.strategy,
            retry_base_delay_ms: failover.base_delay.as_millis() as u64,
            retry_max_delay_ms: failover.max_delay.as_millis() as u64,
            disable_jitter: !failover.jitter,
            sweep_interval_ms: 1000,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            enable_compression: false,
            client_id: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
        }
    }
}

impl Config {
    /// Command line and environment. A `--config-file` replaces both, with
    /// environment overrides applied on top of the file.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        if let Some(path) = config.config_file.clone() {
            return Self::from_file(path);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = Some(path.to_path_buf());
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoints) = std::env::var("LOGSYNC_ENDPOINTS") {
            self.endpoints = endpoints
                .split(',')
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .map(str::to_string)
                .collect();
        }

        load_env_var("LOGSYNC_BATCH_VOLUME", &mut self.batch_volume)?;
        load_env_var("LOGSYNC_VOLUME_THRESHOLD", &mut self.volume_threshold)?;
        load_env_var("LOGSYNC_MAX_VOLUME", &mut self.maximum_allowed_volume)?;
        load_env_var("LOGSYNC_UPLOAD_TIMEOUT_SECS", &mut self.upload_timeout_secs)?;
        load_env_enum("LOGSYNC_TIMEOUT_SCOPE", &mut self.timeout_scope)?;
        load_env_enum("LOGSYNC_FAILURE_POLICY", &mut self.failure_policy)?;

        if let Ok(value) = std::env::var("LOGSYNC_MAX_RECORD_SIZE") {
            let limit = value.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid LOGSYNC_MAX_RECORD_SIZE: {e}"))
            })?;
            self.max_record_size = Some(limit);
        }

        load_env_enum("LOGSYNC_RETRY_STRATEGY", &mut self.retry_strategy)?;
        load_env_var("LOGSYNC_RETRY_BASE_DELAY_MS", &mut self.retry_base_delay_ms)?;
        load_env_var("LOGSYNC_RETRY_MAX_DELAY_MS", &mut self.retry_max_delay_ms)?;
        load_env_var("LOGSYNC_DISABLE_JITTER", &mut self.disable_jitter)?;
        load_env_var("LOGSYNC_SWEEP_INTERVAL_MS", &mut self.sweep_interval_ms)?;
        load_env_var("LOGSYNC_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        load_env_var("LOGSYNC_CONNECT_TIMEOUT_SECS", &mut self.connect_timeout_secs)?;
        load_env_var("LOGSYNC_ENABLE_COMPRESSION", &mut self.enable_compression)?;

        if let Ok(client_id) = std::env::var("LOGSYNC_CLIENT_ID") {
            self.client_id = Some(client_id);
        }

        load_env_enum("LOG_LEVEL", &mut self.log_level)?;
        load_env_enum("LOG_FORMAT", &mut self.log_format)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one endpoint must be configured".to_string(),
            ));
        }

        for endpoint in &self.endpoints {
            Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid endpoint URL '{endpoint}': {e}"))
            })?;
        }

        self.upload_config().validate()?;

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "Retry base delay ({}ms) exceeds retry max delay ({}ms)",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            )));
        }

        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Sweep interval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "HTTP timeouts must be greater than 0".to_string(),
            ));
        }

        if self.max_record_size == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Max record size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn upload_config(&self) -> LogUploadConfig {
        LogUploadConfig {
            batch_volume: self.batch_volume,
            volume_threshold: self.volume_threshold,
            maximum_allowed_volume: self.maximum_allowed_volume,
            upload_timeout: Duration::from_secs(self.upload_timeout_secs),
            timeout_scope: self.timeout_scope,
        }
    }

    pub fn failover_config(&self) -> FailoverConfig {
        FailoverConfig {
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            strategy: self.retry_strategy,
            jitter: !self.disable_jitter,
        }
    }

    pub fn http_config(&self) -> HttpEndpointConfig {
        HttpEndpointConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            enable_compression: self.enable_compression,
            client_id: self.client_id.clone().unwrap_or_else(default_client_id),
            ..HttpEndpointConfig::default()
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Parses an environment variable into `target`, keeping the current value when unset.
fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Same as [`load_env_var`] for clap value enums, case-insensitive.
fn load_env_enum<T: ValueEnum>(name: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = T::from_str(&value, true)
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_endpoints() {
        let config = Config::try_parse_from([
            "logsync-client",
            "--endpoint",
            "http://a:1/logs,http://b:2/logs",
        ])
        .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = Config {
            endpoints: vec!["not a url".to_string()],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_threshold_above_cap_rejected() {
        let config = Config {
            volume_threshold: 10,
            maximum_allowed_volume: 5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Upload(_))));
    }

    #[test]
    fn test_derived_configs() {
        let config = Config {
            upload_timeout_secs: 5,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 20,
            disable_jitter: true,
            client_id: Some("node-1".to_string()),
            ..Config::default()
        };

        assert_eq!(config.upload_config().upload_timeout, Duration::from_secs(5));
        assert_eq!(config.failover_config().max_delay, Duration::from_millis(20));
        assert!(!config.failover_config().jitter);
        assert_eq!(config.http_config().client_id, "node-1");
    }
}
