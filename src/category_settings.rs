//! Persisted, user-editable category configuration.
//!
//! The categories live in a JSON document of the form
//!
//! ```json
//! {
//!   "categories": { "Images": [".png", ".jpg"], "Others": [] },
//!   "version": "1.0",
//!   "last_modified": "2025-01-01T12:00:00+01:00"
//! }
//! ```
//!
//! Loading never fails: a missing or malformed file yields the built-in
//! defaults. Every mutation is applied in memory first and then written back;
//! if the write fails the in-memory change stays usable for the session and the
//! error is returned so the caller can report it.

use crate::file_category::{CategoryMap, CategoryRule, FALLBACK_CATEGORY, is_folder_name};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format version written to the settings file.
pub const SETTINGS_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Category name cannot be empty")]
    EmptyName,

    #[error("Category name '{0}' must be a single folder name")]
    InvalidName(String),

    #[error("Category '{0}' needs at least one extension")]
    NoExtensions(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category '{0}' already exists")]
    CategoryExists(String),

    #[error("Category '{0}' is reserved and cannot be removed or renamed")]
    ReservedCategory(String),

    #[error("Failed to save categories to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize categories: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// On-disk shape of the settings file.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsDocument {
    categories: CategoryMap,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    last_modified: Option<DateTime<Local>>,
}

/// Owns the category map and the file it is persisted to.
#[derive(Debug)]
pub struct CategorySettings {
    path: PathBuf,
    categories: CategoryMap,
}

impl CategorySettings {
    /// Loads categories from `path`, falling back to defaults when the file is
    /// missing or cannot be parsed.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let categories = Self::read_categories(&path).unwrap_or_default();
        Self { path, categories }
    }

    fn read_categories(path: &Path) -> Option<CategoryMap> {
        if !path.exists() {
            tracing::debug!("No category settings at {}, using defaults", path.display());
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "Could not read category settings {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<SettingsDocument>(&content) {
            Ok(document) => {
                let mut categories = document.categories;
                categories.ensure_fallback();
                Some(categories)
            }
            Err(e) => {
                tracing::warn!(
                    "Malformed category settings {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Writes the current categories to disk.
    pub fn save(&self) -> SettingsResult<()> {
        let document = SettingsDocument {
            categories: self.categories.clone(),
            version: Some(SETTINGS_VERSION.to_string()),
            last_modified: Some(Local::now()),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }
        fs::write(&self.path, json).map_err(|e| self.persist_error(e))?;

        tracing::debug!("Saved category settings to {}", self.path.display());
        Ok(())
    }

    fn persist_error(&self, source: std::io::Error) -> SettingsError {
        tracing::error!(
            "Error saving category settings {}: {}",
            self.path.display(),
            source
        );
        SettingsError::Persist {
            path: self.path.clone(),
            source,
        }
    }

    /// Adds a category, or replaces the extensions of an existing one in place.
    pub fn add_category<S: AsRef<str>>(&mut self, name: &str, extensions: &[S]) -> SettingsResult<()> {
        let rule = Self::validated_rule(name, extensions)?;
        self.categories.upsert(rule);
        self.save()
    }

    /// Renames and/or re-extends a category, keeping its position in the map.
    pub fn edit_category<S: AsRef<str>>(
        &mut self,
        old_name: &str,
        new_name: &str,
        extensions: &[S],
    ) -> SettingsResult<()> {
        if !self.categories.contains(old_name) {
            return Err(SettingsError::UnknownCategory(old_name.to_string()));
        }
        let rule = if old_name == FALLBACK_CATEGORY {
            if new_name.trim() != FALLBACK_CATEGORY {
                return Err(SettingsError::ReservedCategory(old_name.to_string()));
            }
            // the fallback may legitimately claim nothing
            CategoryRule::new(FALLBACK_CATEGORY, extensions)
        } else {
            Self::validated_rule(new_name, extensions)?
        };
        if rule.name != old_name && self.categories.contains(&rule.name) {
            return Err(SettingsError::CategoryExists(rule.name));
        }

        self.categories.replace(old_name, rule);
        self.save()
    }

    /// Removes a category. The fallback category cannot be removed.
    pub fn remove_category(&mut self, name: &str) -> SettingsResult<()> {
        if name == FALLBACK_CATEGORY {
            return Err(SettingsError::ReservedCategory(name.to_string()));
        }
        if self.categories.remove(name).is_none() {
            return Err(SettingsError::UnknownCategory(name.to_string()));
        }
        self.save()
    }

    /// Restores the built-in categories.
    pub fn reset_to_defaults(&mut self) -> SettingsResult<()> {
        self.categories = CategoryMap::default();
        self.save()
    }

    fn validated_rule<S: AsRef<str>>(name: &str, extensions: &[S]) -> SettingsResult<CategoryRule> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::EmptyName);
        }
        if !is_folder_name(name) {
            return Err(SettingsError::InvalidName(name.to_string()));
        }
        let rule = CategoryRule::new(name, extensions);
        if rule.extensions.is_empty() {
            return Err(SettingsError::NoExtensions(name.to_string()));
        }
        Ok(rule)
    }
}
