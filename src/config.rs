use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reflector::CallMode;

pub const ENV_CALL_TIMEOUT_MS: &str = "REFLECTOR_CALL_TIMEOUT_MS";
pub const ENV_READY_TIMEOUT_MS: &str = "REFLECTOR_READY_TIMEOUT_MS";
pub const ENV_BRIDGE_PREFIX: &str = "REFLECTOR_BRIDGE_PREFIX";
pub const ENV_DEFAULT_MODE: &str = "REFLECTOR_DEFAULT_MODE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("invalid value for {key}: {message}")]
    Env { key: String, message: String },
    #[error("config validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectorConfig {
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_bridge_prefix")]
    pub bridge_prefix: String,
    #[serde(default)]
    pub default_mode: CallMode,
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_ready_timeout_ms() -> u64 {
    5_000
}

fn default_bridge_prefix() -> String {
    "loaded-extensions".to_string()
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            bridge_prefix: default_bridge_prefix(),
            default_mode: CallMode::default(),
        }
    }
}

impl ReflectorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults overridden by the process environment (and `.env`, if any).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layered load: defaults, then the JSON file at `path` if given, then
    /// the process environment (and `.env`, if any).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`ReflectorConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Apply `REFLECTOR_*` overrides from `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = get(ENV_CALL_TIMEOUT_MS) {
            self.call_timeout_ms = parse_millis(ENV_CALL_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_READY_TIMEOUT_MS) {
            self.ready_timeout_ms = parse_millis(ENV_READY_TIMEOUT_MS, &raw)?;
        }
        if let Some(prefix) = get(ENV_BRIDGE_PREFIX) {
            self.bridge_prefix = prefix;
        }
        if let Some(raw) = get(ENV_DEFAULT_MODE) {
            self.default_mode = raw.parse().map_err(|message| ConfigError::Env {
                key: ENV_DEFAULT_MODE.to_string(),
                message,
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("call_timeout_ms must be positive".to_string()));
        }
        if self.ready_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ready_timeout_ms must be positive".to_string()));
        }
        if self.bridge_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("bridge_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|e| ConfigError::Env {
        key: key.to_string(),
        message: format!("{raw:?} is not a millisecond count: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReflectorConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.ready_timeout(), Duration::from_secs(5));
        assert_eq!(config.bridge_prefix, "loaded-extensions");
        assert_eq!(config.default_mode, CallMode::Async);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ReflectorConfig::from_json_str(r#"{"call_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.call_timeout_ms, 250);
        assert_eq!(config.ready_timeout_ms, 5_000);

        let config = ReflectorConfig::from_json_str(r#"{"default_mode": "sync"}"#).unwrap();
        assert_eq!(config.default_mode, CallMode::Sync);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ReflectorConfig::from_json_str(r#"{"ready_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ReflectorConfig::default();
        config
            .apply_env(lookup(&[
                (ENV_CALL_TIMEOUT_MS, "1500"),
                (ENV_BRIDGE_PREFIX, " ext-list "),
                (ENV_READY_TIMEOUT_MS, "   "),
                (ENV_DEFAULT_MODE, "sync"),
            ]))
            .unwrap();

        assert_eq!(config.call_timeout_ms, 1500);
        assert_eq!(config.ready_timeout_ms, 5_000);
        assert_eq!(config.bridge_prefix, "ext-list");
        assert_eq!(config.default_mode, CallMode::Sync);
    }

    #[test]
    fn test_bad_env_value_names_key() {
        let mut config = ReflectorConfig::default();
        let err = config
            .apply_env(lookup(&[(ENV_CALL_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CALL_TIMEOUT_MS));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bridge_prefix": "from-file", "call_timeout_ms": 42}}"#).unwrap();

        let config = ReflectorConfig::load_file(file.path()).unwrap();
        assert_eq!(config.bridge_prefix, "from-file");
        assert_eq!(config.call_timeout_ms, 42);

        let missing = ReflectorConfig::load_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"call_timeout_ms": 42, "bridge_prefix": "from-file"}}"#).unwrap();

        let config = ReflectorConfig::load_with(
            Some(file.path()),
            lookup(&[(ENV_CALL_TIMEOUT_MS, "7")]),
        )
        .unwrap();
        assert_eq!(config.call_timeout_ms, 7);
        assert_eq!(config.bridge_prefix, "from-file");

        let config = ReflectorConfig::load_with(None, lookup(&[(ENV_READY_TIMEOUT_MS, "9")])).unwrap();
        assert_eq!(config.ready_timeout_ms, 9);
        assert_eq!(config.call_timeout_ms, 10_000);
    }
}
