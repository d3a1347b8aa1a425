//! Client configuration.
//!
//! Sources are merged in this order (later wins):
//! 1. `ClientConfig::default()`
//! 2. a TOML file: the explicit path if given, else `studio.toml` in the
//!    working directory when it exists
//! 3. environment variables prefixed `STUDIO_` (`STUDIO_BASE_URL`, ...)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::client::StudioClient;
use crate::error::ApiError;

pub const DEFAULT_CONFIG_FILENAME: &str = "studio.toml";
pub const ENV_PREFIX: &str = "STUDIO_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Where downloaded exports are saved.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            token: None,
            timeout_secs: 30,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn client(&self) -> Result<StudioClient, ApiError> {
        let client = StudioClient::new(&self.base_url)?;
        Ok(match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let is_http = Url::parse(&self.base_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !is_http {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(ClientConfig::default()));

        match &self.config_path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading configuration file");
                figment = figment.merge(Toml::file(path));
            }
            Some(path) => warn!(path = %path.display(), "configuration file not found"),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    debug!(path = %default_path.display(), "loading configuration file");
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        let config: ClientConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}
