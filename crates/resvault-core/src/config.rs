//! Configuration types for resvault components.
//!
//! Every section has working defaults, so running without a configuration
//! file backs up transport.data.gouv.fr into Clever Cloud Cellar. A TOML file
//! can override any field:
//!
//! ```toml
//! [catalog]
//! url = "https://transport.data.gouv.fr/api/datasets"
//! timeout_secs = 60
//!
//! [storage]
//! endpoint = "https://cellar-c2.services.clever-cloud.com"
//!
//! [backup]
//! concurrency = 4
//! formats = ["GTFS", "NETEX", "gtfs-rt"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{Dataset, Resource};

/// Environment variable holding an explicit configuration file path.
pub const CONFIG_ENV_VAR: &str = "RESVAULT_CONFIG";

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "resvault.toml";

/// Root configuration structure for resvault.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResvaultConfig {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub backup: BackupConfig,
}

/// Catalog API access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Endpoint returning the dataset list.
    pub url: String,
    /// Timeout applied to catalog and download requests.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://transport.data.gouv.fr/api/datasets".to_string(),
            timeout_secs: 300,
            user_agent: format!("resvault/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// S3-compatible storage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    /// Use `endpoint/bucket/key` addressing instead of virtual-hosted buckets.
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cellar-c2.services.clever-cloud.com".to_string(),
            region: "us-east-1".to_string(),
            force_path_style: true,
        }
    }
}

/// Backup run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Number of resources of one dataset processed concurrently.
    pub concurrency: usize,
    /// Decide and report without downloading or writing anything.
    pub dry_run: bool,
    /// Dataset types to back up; empty accepts every type.
    pub dataset_types: Vec<String>,
    /// Resource formats to back up (case-insensitive); empty accepts every format.
    pub formats: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            dry_run: false,
            dataset_types: vec!["public-transit".to_string()],
            formats: vec!["GTFS".to_string(), "NETEX".to_string()],
        }
    }
}

impl BackupConfig {
    /// Returns a copy with dry-run enabled.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Returns a copy with the given concurrency (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Returns a copy that accepts every dataset and resource with a URL.
    pub fn accept_all(mut self) -> Self {
        self.dataset_types.clear();
        self.formats.clear();
        self
    }

    /// Whether a dataset's type is selected for backup.
    pub fn accepts_dataset(&self, dataset: &Dataset) -> bool {
        if self.dataset_types.is_empty() {
            return true;
        }
        dataset
            .dataset_type
            .as_deref()
            .is_some_and(|t| self.dataset_types.iter().any(|allowed| allowed == t))
    }

    /// Whether a resource is selected for backup.
    ///
    /// Resources without a download URL are never selected.
    pub fn accepts_resource(&self, resource: &Resource) -> bool {
        if resource.url.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return false;
        }
        if self.formats.is_empty() {
            return true;
        }
        resource
            .format
            .as_deref()
            .is_some_and(|f| self.formats.iter().any(|allowed| allowed.eq_ignore_ascii_case(f)))
    }
}

/// Returns the default configuration directory path.
///
/// Uses XDG Base Directory specification: `~/.config/resvault/`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("resvault"))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Load configuration from a TOML file.
///
/// # Arguments
/// * `path` - Optional explicit path. If `None`, uses the default XDG path.
///
/// # Behavior
/// * explicit path that does not exist -> `AppError::ConfigError`
/// * default path that does not exist -> built-in defaults
/// * file that exists but is invalid -> `AppError::ConfigError`
pub fn load_config(path: Option<PathBuf>) -> Result<ResvaultConfig, AppError> {
    let explicit = path.is_some();
    let config_path = match path.or_else(default_config_path) {
        Some(p) => p,
        None => return Ok(ResvaultConfig::default()),
    };

    if !config_path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }
        tracing::debug!(
            path = %config_path.display(),
            "No config file, using defaults"
        );
        return Ok(ResvaultConfig::default());
    }

    read_config(&config_path)
}

fn read_config(path: &Path) -> Result<ResvaultConfig, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config: ResvaultConfig = toml::from_str(&content).map_err(|e| {
        AppError::ConfigError(format!("Invalid TOML in '{}': {}", path.display(), e))
    })?;

    if config.backup.concurrency == 0 {
        return Err(AppError::ConfigError(format!(
            "backup.concurrency must be at least 1 in '{}'",
            path.display()
        )));
    }

    tracing::info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
