use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::ConfigLoader;

use crate::error::{BridgeError, ErrorCode};
use crate::subprocess::DEFAULT_MAX_OUTPUT_BYTES;

const ENV_LOG_LEVEL: &str = "CMDBRIDGE_LOG_LEVEL";
const ENV_DEFAULT_DEADLINE: &str = "CMDBRIDGE_DEFAULT_DEADLINE";
const ENV_MAX_OUTPUT_BYTES: &str = "CMDBRIDGE_MAX_OUTPUT_BYTES";

/// Platform configuration directory for cmdbridge
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "cmdbridge", "cmdbridge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorCode::CONFIG_NOT_FOUND
            }
            ConfigError::Read { .. } => ErrorCode::CONFIG_PATH_ERROR,
            ConfigError::Parse { .. } => ErrorCode::CONFIG_INVALID_TOML,
            ConfigError::InvalidValue { .. } => ErrorCode::CONFIG_INVALID_VALUE,
        };
        BridgeError::config_with_code(code, err.to_string()).with_source(err)
    }
}

/// Engine settings
///
/// ```toml
/// default_deadline = "60s"
/// max_output_bytes = 8388608
/// log_level = "info"
///
/// [deadlines]
/// git_clone = "10m"
///
/// [credentials]
/// "github.com" = "ghp_..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides every operation's built-in deadline when set
    #[serde(with = "humantime_serde")]
    pub default_deadline: Option<Duration>,
    /// Per-operation deadlines, keyed by operation name
    #[serde(with = "duration_map")]
    pub deadlines: HashMap<String, Duration>,
    pub max_output_bytes: usize,
    pub log_level: Option<String>,
    /// Host name to access token
    pub credentials: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_deadline: None,
            deadlines: HashMap::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            log_level: None,
            credentials: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_env_vars(&mut self) -> Result<(), ConfigError> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(level);
        }

        if let Some(deadline) = lookup(ENV_DEFAULT_DEADLINE) {
            let parsed = humantime::parse_duration(deadline.trim()).map_err(|e| {
                ConfigError::InvalidValue {
                    key: ENV_DEFAULT_DEADLINE.to_string(),
                    message: e.to_string(),
                }
            })?;
            self.default_deadline = Some(parsed);
        }

        if let Some(limit) = lookup(ENV_MAX_OUTPUT_BYTES) {
            self.max_output_bytes =
                limit
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: ENV_MAX_OUTPUT_BYTES.to_string(),
                        message: e.to_string(),
                    })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_output_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let zero = self
            .default_deadline
            .iter()
            .map(|d| ("default_deadline", d))
            .chain(self.deadlines.iter().map(|(k, d)| (k.as_str(), d)))
            .find(|(_, d)| d.is_zero());
        if let Some((key, _)) = zero {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "deadline must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Deadline for `operation`: per-operation entry, then the configured
    /// default, then the operation's built-in value
    pub fn deadline_for(&self, operation: &str, builtin: Duration) -> Duration {
        self.deadlines
            .get(operation)
            .copied()
            .or(self.default_deadline)
            .unwrap_or(builtin)
    }

    pub fn get_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// `HashMap<String, Duration>` with human-readable values ("90s", "10m")
mod duration_map {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::HashMap;
    use std::time::Duration;

    pub fn serialize<S>(map: &HashMap<String, Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(
            map.iter()
                .map(|(key, value)| (key, humantime::format_duration(*value).to_string())),
        )
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<String, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| {
                humantime::parse_duration(&value)
                    .map(|duration| (key.clone(), duration))
                    .map_err(|e| D::Error::custom(format!("{key}: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(config.get_log_level(), "info");
        assert_eq!(
            config.deadline_for("git_status", Duration::from_secs(30)),
            Duration::from_secs(30)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
default_deadline = "90s"
max_output_bytes = 1024
log_level = "debug"

[deadlines]
git_clone = "10m"

[credentials]
"github.com" = "tok"
"#,
        )
        .unwrap();

        assert_eq!(config.max_output_bytes, 1024);
        assert_eq!(
            config.deadline_for("git_clone", Duration::from_secs(300)),
            Duration::from_secs(600)
        );
        assert_eq!(
            config.deadline_for("git_status", Duration::from_secs(30)),
            Duration::from_secs(90)
        );
        assert_eq!(config.credentials.get("github.com"), Some(&"tok".to_string()));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config
            .merge_env_from(|key| match key {
                ENV_LOG_LEVEL => Some("trace".to_string()),
                ENV_DEFAULT_DEADLINE => Some("2m".to_string()),
                ENV_MAX_OUTPUT_BYTES => Some("4096".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.get_log_level(), "trace");
        assert_eq!(config.default_deadline, Some(Duration::from_secs(120)));
        assert_eq!(config.max_output_bytes, 4096);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = EngineConfig::default();
        let err = config
            .merge_env_from(|key| (key == ENV_DEFAULT_DEADLINE).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let bridge: BridgeError = err.into();
        assert_eq!(bridge.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = EngineConfig::default();
        config.deadlines.insert("git_log".to_string(), Duration::ZERO);
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_output_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
