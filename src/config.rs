//! Application configuration.
//!
//! Configuration is read from TOML. Every section is optional:
//!
//! ```toml
//! [storage]
//! categories_file = "/home/me/.config/tidydir/categories.json"
//! history_file = "/home/me/.local/share/tidydir/operations.json"
//! log_file = "/home/me/.local/share/tidydir/tidydir.log"
//!
//! [history]
//! max_records = 10
//!
//! [[filters]]
//! name = "exclude_hidden"
//! kind = "hidden"
//!
//! [[filters]]
//! name = "big_files"
//! kind = "size"
//! min_size = 1048576
//! enabled = false
//! ```

use crate::category_settings::CategorySettings;
use crate::filters::{FileFilter, FileFilterChain, NamedFilter};
use crate::undo::{DEFAULT_MAX_RECORDS, OperationLedger};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "tidydir";
const LOCAL_CONFIG: &str = ".tidydirrc.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where persistent state lives. Unset paths use platform defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub categories_file: Option<PathBuf>,
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl StorageConfig {
    pub fn categories_path(&self) -> PathBuf {
        self.categories_file
            .clone()
            .unwrap_or_else(|| app_config_dir().join("categories.json"))
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| app_data_dir().join("operations.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| app_data_dir().join("tidydir.log"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    DEFAULT_MAX_RECORDS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

fn default_filters() -> Vec<NamedFilter> {
    vec![NamedFilter {
        name: "exclude_hidden".to_string(),
        enabled: true,
        filter: FileFilter::Hidden,
    }]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default = "default_filters")]
    pub filters: Vec<NamedFilter>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
            filters: default_filters(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tidydirrc.toml` in the current directory
    /// 3. Look for `tidydir/config.toml` in the platform config directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the file that would be used cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(APP_DIR).join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// A configuration whose state files all live under `dir`.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            storage: StorageConfig {
                categories_file: Some(dir.join("categories.json")),
                history_file: Some(dir.join("operations.json")),
                log_file: Some(dir.join("tidydir.log")),
            },
            ..Self::default()
        }
    }

    pub fn filter_chain(&self) -> FileFilterChain {
        FileFilterChain::from_filters(self.filters.iter().cloned())
    }

    pub fn ledger(&self) -> OperationLedger {
        OperationLedger::new(self.storage.history_path()).with_max_records(self.history.max_records)
    }

    pub fn category_settings(&self) -> CategorySettings {
        CategorySettings::load(self.storage.categories_path())
    }
}

fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{NameFilter, NameMatchMode, SizeFilter};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_excludes_hidden_files() {
        let config = AppConfig::default();
        assert_eq!(config.filters, default_filters());
        assert_eq!(config.history.max_records, 10);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(
            r#"
            [storage]
            history_file = "/tmp/ops.json"

            [history]
            max_records = 3

            [[filters]]
            name = "docs"
            kind = "name"
            pattern = "report*"
            mode = "glob"

            [[filters]]
            name = "big"
            kind = "size"
            min_size = 1024
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.history_path(), PathBuf::from("/tmp/ops.json"));
        assert_eq!(config.history.max_records, 3);
        assert_eq!(config.filters.len(), 2);
        assert!(!config.filters[1].enabled);
        assert_eq!(
            config.filters[1].filter,
            FileFilter::Size(SizeFilter {
                min_size: Some(1024),
                max_size: None,
            })
        );
        assert!(matches!(
            &config.filters[0].filter,
            FileFilter::Name(NameFilter {
                mode: NameMatchMode::Glob,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_filter_list_disables_default() {
        let config = AppConfig::from_toml("filters = []").unwrap();
        assert!(config.filter_chain().is_empty());
    }

    #[test]
    fn test_unknown_filter_kind_is_invalid() {
        let result = AppConfig::from_toml(
            r#"
            [[filters]]
            name = "x"
            kind = "colour"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/non/existent/tidydir.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file_reports_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[history\nmax_records = ").unwrap();

        let result = AppConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_rooted_at_places_state_in_dir() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::rooted_at(dir.path());
        assert_eq!(config.ledger().history_file(), dir.path().join("operations.json"));
        assert_eq!(
            config.category_settings().path(),
            dir.path().join("categories.json")
        );
    }
}
