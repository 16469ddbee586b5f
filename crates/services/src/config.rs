use std::path::PathBuf;

use dex_core::model::{Catalog, CatalogFile};
use storage::RemoteConfig;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://doggydex.sqlite3";

pub const ENV_DB_URL: &str = "DOGGYDEX_DB_URL";
pub const ENV_CATALOG: &str = "DOGGYDEX_CATALOG";
pub const ENV_REMOTE_URL: &str = "DOGGYDEX_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "DOGGYDEX_REMOTE_TOKEN";

/// Runtime settings: local cache location, optional catalog file, optional
/// remote document service.
#[derive(Debug, Clone)]
pub struct DexConfig {
    pub db_url: String,
    pub catalog_path: Option<PathBuf>,
    pub remote: Option<RemoteConfig>,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            catalog_path: None,
            remote: None,
        }
    }
}

impl DexConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRemoteUrl` if the remote URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRemoteUrl` if the remote URL does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self {
            db_url: get(ENV_DB_URL).unwrap_or_else(|| DEFAULT_DB_URL.to_owned()),
            catalog_path: get(ENV_CATALOG).map(PathBuf::from),
            remote: None,
        };
        if let Some(url) = get(ENV_REMOTE_URL) {
            config.set_remote(&url, get(ENV_REMOTE_TOKEN))?;
        }
        Ok(config)
    }

    /// Point the config at a remote document service.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRemoteUrl` if `url` does not parse.
    pub fn set_remote(&mut self, url: &str, token: Option<String>) -> Result<(), ConfigError> {
        let remote = RemoteConfig::new(url, token).map_err(|source| {
            ConfigError::InvalidRemoteUrl {
                raw: url.to_owned(),
                source,
            }
        })?;
        self.remote = Some(remote);
        Ok(())
    }

    /// The configured catalog file, or the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or holds an invalid catalog.
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        let Some(path) = &self.catalog_path else {
            return Ok(Catalog::builtin());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
            path: path.clone(),
            source,
        })?;
        Ok(CatalogFile::from_json(&raw)?.into_catalog()?)
    }
}
