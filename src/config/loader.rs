use super::{default_config_path, ConfigError, EngineConfig};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Loads [`EngineConfig`] from disk and applies environment overrides.
///
/// An explicitly requested file must exist. The default location is
/// optional: when it is missing the built-in defaults are used.
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
    apply_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            explicit_path: None,
            apply_env: true,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Skip `CMDBRIDGE_*` environment overrides
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    pub async fn load(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = match &self.explicit_path {
            Some(path) => Self::load_file(path).await?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path).await?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    EngineConfig::default()
                }
            },
        };

        if self.apply_env {
            config.merge_env_vars()?;
        }
        config.validate()?;

        tracing::debug!(
            "Loaded config: max_output_bytes={}, {} deadline override(s), {} credential host(s)",
            config.max_output_bytes,
            config.deadlines.len(),
            config.credentials.len()
        );
        Ok(config)
    }

    async fn load_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<EngineConfig, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
