//! tidydir - sort the files of a directory into category folders
//!
//! This library maps file extensions to categories, filters candidate files,
//! moves them into per-category subfolders (or previews that move), and keeps
//! a bounded history of runs so each one can be undone.

pub mod category_settings;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod filters;
pub mod logging;
pub mod output;
pub mod preview;
pub mod statistics;
pub mod undo;

pub use category_settings::{CategorySettings, SettingsError};
pub use config::{AppConfig, ConfigError};
pub use file_category::{CategoryMap, CategoryResolver, CategoryRule, FALLBACK_CATEGORY};
pub use file_organizer::{FileOrganizer, OrganizeError, OrganizeOutcome};
pub use filters::{FileFilter, FileFilterChain, NamedFilter};
pub use preview::{PreviewEngine, PreviewItem, PreviewSummary};
pub use statistics::{DirectoryStatistics, format_file_size};
pub use undo::{LedgerError, OperationLedger, OperationRecord, OperationStatus, UndoReport};

pub use cli::{Command, run_cli};
