use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &["shellac.toml", "config/shellac.toml"];

const ENV_REDIS_URL: &str = "SHELLAC_REDIS_URL";
const ENV_BIND: &str = "SHELLAC_BIND";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Attempt cap for the popular-ranking read; unset retries indefinitely.
    pub top_retry_limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value in {var}: {message}")]
    Env { var: String, message: String },
}

/// Loads configuration from an explicit path, the default locations, or
/// built-in defaults, then applies environment overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<Config, ConfigLoadError> {
        let mut config = match &self.config_path {
            Some(path) => Self::from_file(path)?,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(Path::new)
                .find(|path| path.exists())
            {
                Some(path) => Self::from_file(path)?,
                None => Config::default(),
            },
        };

        Self::apply_env(&mut config)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config, ConfigLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(config: &mut Config) -> Result<(), ConfigLoadError> {
        if let Ok(url) = env::var(ENV_REDIS_URL) {
            config.redis.url = url;
        }
        if let Ok(bind) = env::var(ENV_BIND) {
            config.server.bind = bind.parse().map_err(|_| ConfigLoadError::Env {
                var: ENV_BIND.to_string(),
                message: format!("`{bind}` is not a socket address"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.server.bind.port(), 3000);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.redis.pool_size, 10);
        assert_eq!(config.catalog.top_retry_limit, None);
    }

    #[test]
    fn parses_a_full_config_file() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [redis]
            url = "redis://cache:6379"
            pool_size = 4

            [catalog]
            top_retry_limit = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.redis.pool_size, 4);
        assert_eq!(config.catalog.top_retry_limit, Some(16));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:8080"
            tls = true
            "#,
        );
        assert!(result.is_err());
    }
}
