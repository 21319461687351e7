use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate;

/// Value that disables brokers or the metrics listener.
pub const OFF: &str = "off";

/// Names the config file when `--conf` is not given.
pub const CONFIG_FILE_ENV: &str = "GTMCDC_ENV";

/// Enables developer mode when set to a non-false value.
pub const DEV_MODE_ENV: &str = "GTMCDC_DEVMODE";

pub const DEFAULT_CONFIG_FILE: &str = "filter.env";

pub const KEY_KAFKA_BROKERS: &str = "GTMCDC_KAFKA_BROKERS";
pub const KEY_KAFKA_TOPIC: &str = "GTMCDC_KAFKA_TOPIC";
pub const KEY_KAFKA_TIMEOUT_MS: &str = "GTMCDC_KAFKA_TIMEOUT_MS";
pub const KEY_PROM_HTTP_ADDR: &str = "GTMCDC_PROM_HTTP_ADDR";
pub const KEY_LOG: &str = "GTMCDC_LOG";
pub const KEY_LOG_LEVEL: &str = "GTMCDC_LOG_LEVEL";
pub const KEY_INPUT: &str = "GTMCDC_INPUT";
pub const KEY_OUTPUT: &str = "GTMCDC_OUTPUT";

/// Effective filter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Comma-separated broker list, or `off`.
    pub kafka_brokers: String,
    pub kafka_topic: String,
    /// How long a single publish may wait in the producer queue.
    pub kafka_timeout_ms: u64,
    /// `host:port` of the Prometheus listener, or `off`.
    pub prom_http_addr: String,
    /// Log file path, or `stderr`.
    pub log_file: String,
    pub log_level: String,
    /// Input path, or `stdin`.
    pub input_file: String,
    /// Output path, or `stdout`.
    pub output_file: String,
    pub dev_mode: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kafka_brokers: OFF.to_string(),
            kafka_topic: "cdc-test".to_string(),
            kafka_timeout_ms: 5_000,
            prom_http_addr: OFF.to_string(),
            log_file: "filter.log".to_string(),
            log_level: "info".to_string(),
            input_file: "stdin".to_string(),
            output_file: "stdout".to_string(),
            dev_mode: false,
        }
    }
}

/// Settings from one source. Unset keys are `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub kafka_brokers: Option<String>,
    pub kafka_topic: Option<String>,
    pub kafka_timeout_ms: Option<u64>,
    pub prom_http_addr: Option<String>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub dev_mode: Option<bool>,
}

impl RawConfig {
    /// Parse a `filter.toml` document.
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(toml_str)?;
        Ok(raw)
    }

    /// Collect `GTMCDC_*` pairs; other keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawConfig::default();
        for (key, value) in pairs {
            raw.set(key.as_ref(), value.as_ref())?;
        }
        Ok(raw)
    }

    /// Read a dotenv-style file without touching the process environment.
    pub fn from_env_file(path: &Path) -> ConfigResult<Self> {
        let pairs = dotenvy::from_path_iter(path)?.collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }

    /// Read `GTMCDC_*` variables from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let pairs = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .filter(|(k, _)| k.starts_with("GTMCDC_"));
        Self::from_pairs(pairs)
    }

    fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let value = value.trim();
        let text = || Some(value.to_string());

        match key {
            KEY_KAFKA_BROKERS => self.kafka_brokers = text(),
            KEY_KAFKA_TOPIC => self.kafka_topic = text(),
            KEY_KAFKA_TIMEOUT_MS => {
                if !value.is_empty() {
                    self.kafka_timeout_ms =
                        Some(value.parse().map_err(|_| invalid_value(key, value))?);
                }
            }
            KEY_PROM_HTTP_ADDR => self.prom_http_addr = text(),
            KEY_LOG => self.log_file = text(),
            KEY_LOG_LEVEL => self.log_level = text(),
            KEY_INPUT => self.input_file = text(),
            KEY_OUTPUT => self.output_file = text(),
            DEV_MODE_ENV => {
                self.dev_mode = Some(parse_bool(value).ok_or_else(|| invalid_value(key, value))?)
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn is_off(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(OFF)
}

impl FilterConfig {
    /// Developer defaults: no brokers, no metrics listener, debug logging.
    pub fn dev() -> Self {
        let mut config = Self::default();
        config.apply_dev_overrides();
        config
    }

    /// Turn on dev mode and force its overrides.
    pub fn apply_dev_overrides(&mut self) {
        self.dev_mode = true;
        self.kafka_brokers = OFF.to_string();
        self.prom_http_addr = OFF.to_string();
        self.log_level = "debug".to_string();
    }

    /// Overlay `raw` onto this config. Empty strings keep the current value.
    pub fn merge(&mut self, raw: RawConfig) {
        fn overlay(target: &mut String, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                *target = v;
            }
        }

        overlay(&mut self.kafka_brokers, raw.kafka_brokers);
        overlay(&mut self.kafka_topic, raw.kafka_topic);
        overlay(&mut self.prom_http_addr, raw.prom_http_addr);
        overlay(&mut self.log_file, raw.log_file);
        overlay(&mut self.log_level, raw.log_level);
        overlay(&mut self.input_file, raw.input_file);
        overlay(&mut self.output_file, raw.output_file);

        if let Some(ms) = raw.kafka_timeout_ms {
            self.kafka_timeout_ms = ms;
        }
        if let Some(dev) = raw.dev_mode {
            self.dev_mode = dev;
        }
    }

    /// Defaults, then the config file if it exists, then the environment.
    ///
    /// In dev mode neither the file nor the environment is read.
    pub fn load(path: Option<&Path>, dev_mode: bool) -> ConfigResult<Self> {
        if dev_mode {
            return Ok(Self::dev());
        }

        let mut config = Self::default();

        if let Some(path) = path.filter(|p| p.exists()) {
            config.merge(load_file(path)?);
        }
        config.merge(RawConfig::from_env()?);

        if config.dev_mode {
            config.apply_dev_overrides();
        }

        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        validate(self)
    }

    pub fn kafka_enabled(&self) -> bool {
        !is_off(&self.kafka_brokers)
    }

    /// Brokers as a list; empty when publishing is off.
    pub fn broker_list(&self) -> Vec<String> {
        if !self.kafka_enabled() {
            return Vec::new();
        }
        self.kafka_brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn kafka_timeout(&self) -> Duration {
        Duration::from_millis(self.kafka_timeout_ms)
    }

    /// The metrics listen address as `host:port`, `None` when disabled.
    ///
    /// A bare `:port` listens on all interfaces. Host names are left for the
    /// listener to resolve.
    pub fn prom_addr(&self) -> ConfigResult<Option<String>> {
        let addr = self.prom_http_addr.trim();
        if is_off(addr) {
            return Ok(None);
        }

        let invalid = || ConfigError::InvalidListenAddr(self.prom_http_addr.clone());
        let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
        port.parse::<u16>().map_err(|_| invalid())?;

        if host.is_empty() {
            return Ok(Some(format!("0.0.0.0:{port}")));
        }
        // an IPv6 host must be bracketed
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid());
        }
        Ok(Some(addr.to_string()))
    }

    pub fn reads_stdin(&self) -> bool {
        is_stream(&self.input_file, "stdin")
    }

    pub fn writes_stdout(&self) -> bool {
        is_stream(&self.output_file, "stdout")
    }
}

fn is_stream(value: &str, name: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(name) || value == "-"
}

/// Read a config file: `.toml` as TOML, anything else as a dotenv file.
pub fn load_file(path: &Path) -> ConfigResult<RawConfig> {
    if path.extension().map_or(false, |ext| ext == "toml") {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        RawConfig::from_toml(&content)
    } else {
        RawConfig::from_env_file(path)
    }
}

/// Resolve the config file: explicit path, then `GTMCDC_ENV`, then
/// `filter.env` next to the executable.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(path) = std::env::var_os(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// True when `GTMCDC_DEVMODE` is set to anything but a false value.
pub fn dev_mode_from_env() -> bool {
    match std::env::var(DEV_MODE_ENV) {
        Ok(value) => parse_bool(value.trim()).unwrap_or(true),
        Err(_) => false,
    }
}
