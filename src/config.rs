use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::catalog::TypeCatalog;
use crate::error::{Result, SyncError};

/// Top-level configuration for a reconciliation run, loaded from a TOML
/// file. Credentials can be overridden through `CMDB_SYNC_USER` and
/// `CMDB_SYNC_PASSWORD` so the file itself never has to carry secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub cmdb: CmdbConfig,
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
    /// Optional path to a type-catalog file overriding the built-in
    /// enumeration.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

/// Connection settings for the remote CMDB.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdbConfig {
    /// Base URL of the service, e.g. `https://example.freshservice.com/`.
    pub base_url: Url,
    pub user: String,
    pub password: String,
}

/// Connection settings for the document archive service.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    pub base_url: Url,
    pub token: String,
    /// Folder receiving element export files.
    pub elements_folder: String,
    /// Folder receiving relationship export files.
    pub relations_folder: String,
}

impl SyncConfig {
    /// Loads configuration from `path`, applying environment overrides for
    /// the CMDB credentials.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            SyncError::Config(format!("cannot read {}: {error}", path.display()))
        })?;
        let mut config: SyncConfig = toml::from_str(&text)?;
        if let Ok(user) = std::env::var("CMDB_SYNC_USER") {
            config.cmdb.user = user;
        }
        if let Ok(password) = std::env::var("CMDB_SYNC_PASSWORD") {
            config.cmdb.password = password;
        }
        Ok(config)
    }

    /// Resolves the type catalog for this run: the configured override
    /// file when present, the built-in enumeration otherwise.
    pub fn load_catalog(&self) -> Result<TypeCatalog> {
        match &self.catalog {
            Some(path) => TypeCatalog::from_path(path),
            None => Ok(TypeCatalog::default()),
        }
    }
}
