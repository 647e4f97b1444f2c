/// Operation history and undo.
///
/// Every organize run that changed something is stored as an [`OperationRecord`]
/// in a JSON history file. The file is read and rewritten whole on each change
/// and only the most recent records are kept. Undo moves files back to their
/// original location and removes folders the run created once they are empty.
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of records kept in the history by default.
pub const DEFAULT_MAX_RECORDS: usize = 10;

/// A single file movement performed by an organize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

/// Lifecycle of a record. `Active` is the only state undo accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Active,
    /// Undo ran but some files could not be restored.
    PartiallyUndone,
    Undone,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Active => write!(f, "active"),
            OperationStatus::PartiallyUndone => write!(f, "partially undone"),
            OperationStatus::Undone => write!(f, "undone"),
        }
    }
}

/// One completed organize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub source_directory: PathBuf,
    pub moves: Vec<MoveRecord>,
    pub folders_created: Vec<PathBuf>,
    pub files_moved: usize,
    pub folders_created_count: usize,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default)]
    pub undo_timestamp: Option<DateTime<Local>>,
}

impl OperationRecord {
    /// True once undo has been attempted, whether or not every file came back.
    pub fn undone(&self) -> bool {
        self.status != OperationStatus::Active
    }
}

/// What an organize run hands to the ledger.
#[derive(Debug, Clone, Default)]
pub struct OperationDraft {
    pub source_directory: PathBuf,
    pub moves: Vec<MoveRecord>,
    pub folders_created: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No operation with id '{0}' in the history")]
    NotFound(String),

    #[error("Operation '{id}' is already {status}")]
    AlreadyUndone { id: String, status: OperationStatus },

    #[error("Failed to read history file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of undoing one operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files moved back to their original location.
    pub restored_files: usize,
    /// Files or folders that could not be restored or removed, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files no longer found where the operation put them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Created folders that were empty and got removed.
    pub folders_removed: Vec<PathBuf>,
    /// Created folders left in place because they still hold something.
    pub folders_kept: Vec<PathBuf>,
    /// Files that sat at an original location and were renamed aside.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every recorded move was reversed.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }

    fn final_status(&self) -> OperationStatus {
        if self.is_complete_success() {
            OperationStatus::Undone
        } else {
            OperationStatus::PartiallyUndone
        }
    }
}

/// Durable, bounded store of operation records.
#[derive(Debug, Clone)]
pub struct OperationLedger {
    history_file: PathBuf,
    max_records: usize,
}

impl OperationLedger {
    pub fn new(history_file: impl Into<PathBuf>) -> Self {
        Self {
            history_file: history_file.into(),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    /// Overrides how many records are retained (at least one).
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    /// Records, oldest first. Missing or corrupt history reads as empty.
    pub fn load_operations(&self) -> Vec<OperationRecord> {
        self.try_load_operations().unwrap_or_else(|e| {
            tracing::error!("Error loading operations: {}", e);
            Vec::new()
        })
    }

    /// Records, oldest first, reporting why the history could not be read.
    pub fn try_load_operations(&self) -> LedgerResult<Vec<OperationRecord>> {
        if !self.history_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.history_file).map_err(|e| LedgerError::Read {
            path: self.history_file.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
            path: self.history_file.clone(),
            reason: e.to_string(),
        })
    }

    pub fn find_operation(&self, id: &str) -> Option<OperationRecord> {
        self.load_operations().into_iter().find(|op| op.id == id)
    }

    /// Most recent record that can still be undone.
    pub fn latest_undoable(&self) -> Option<OperationRecord> {
        self.load_operations().into_iter().rev().find(|op| !op.undone())
    }

    /// Appends a record and returns its id, or `None` if the history could not be written.
    ///
    /// A `None` means undo is unavailable for that run; the caller should carry on.
    pub fn save_operation(&self, draft: OperationDraft) -> Option<String> {
        match self.try_save_operation(draft) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!("Error saving operation: {}", e);
                None
            }
        }
    }

    /// Appends a record, trims the history, and returns the new id.
    pub fn try_save_operation(&self, draft: OperationDraft) -> LedgerResult<String> {
        let mut operations = self.load_operations();
        let now = Local::now();
        let id = Self::unique_id(&operations, now);

        operations.push(OperationRecord {
            id: id.clone(),
            timestamp: now,
            source_directory: draft.source_directory,
            files_moved: draft.moves.len(),
            folders_created_count: draft.folders_created.len(),
            moves: draft.moves,
            folders_created: draft.folders_created,
            status: OperationStatus::Active,
            undo_timestamp: None,
        });

        if operations.len() > self.max_records {
            let excess = operations.len() - self.max_records;
            operations.drain(..excess);
        }

        self.write_operations(&operations)?;
        tracing::info!("Saved operation {} to {}", id, self.history_file.display());
        Ok(id)
    }

    /// Timestamp-derived id, suffixed if another record already used the same instant.
    fn unique_id(operations: &[OperationRecord], now: DateTime<Local>) -> String {
        let base = now.format("%Y%m%d_%H%M%S_%6f").to_string();
        let taken = |candidate: &str| operations.iter().any(|op| op.id == candidate);
        if !taken(&base) {
            return base;
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if !taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Reverses a recorded operation.
    ///
    /// Moves are processed in the order they were recorded. A file missing from
    /// its recorded destination is skipped, a file occupying the original path is
    /// renamed aside first, and created folders are removed only when empty.
    /// Per-item failures are collected in the report and never stop the undo.
    ///
    /// # Errors
    ///
    /// * [`LedgerError::NotFound`] if no record has this id.
    /// * [`LedgerError::AlreadyUndone`] if the record was undone before; the
    ///   filesystem is not touched.
    /// * [`LedgerError::Write`] if the updated status could not be persisted.
    pub fn undo_operation(&self, id: &str) -> LedgerResult<UndoReport> {
        let mut operations = self.load_operations();
        let operation = operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if operation.undone() {
            return Err(LedgerError::AlreadyUndone {
                id: id.to_string(),
                status: operation.status,
            });
        }

        let mut report = UndoReport::default();
        for record in &operation.moves {
            match Self::restore_file(record) {
                Ok(backup) => {
                    tracing::info!(
                        "Undid move: {} -> {}",
                        record.destination_path.display(),
                        record.source_path.display()
                    );
                    report.restored_files += 1;
                    report.backups.extend(backup);
                }
                Err(RestoreFailure::Missing(path)) => {
                    tracing::warn!("Cannot undo move, file not found: {}", path.display());
                    report
                        .skipped_files
                        .push((path, "File not found at expected location".to_string()));
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    tracing::error!("Cannot undo move of {}: {}", path.display(), reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        for folder in &operation.folders_created {
            Self::remove_created_folder(folder, &mut report);
        }

        operation.status = report.final_status();
        operation.undo_timestamp = Some(Local::now());
        tracing::info!("Operation {} marked {}", id, operation.status);

        self.write_operations(&operations)?;
        Ok(report)
    }

    /// Moves one file back, returning the backup path if the original location was occupied.
    fn restore_file(record: &MoveRecord) -> Result<Option<PathBuf>, RestoreFailure> {
        if !record.destination_path.exists() {
            return Err(RestoreFailure::Missing(record.destination_path.clone()));
        }

        let mut backup = None;
        if record.source_path.exists() {
            let backup_path = Self::generate_backup_path(&record.source_path);
            fs::rename(&record.source_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    record.source_path.clone(),
                    format!("Could not backup conflicting file: {}", e),
                )
            })?;
            tracing::warn!(
                "Original location occupied, moved {} aside to {}",
                record.source_path.display(),
                backup_path.display()
            );
            backup = Some(backup_path);
        }

        crate::file_organizer::move_file(&record.destination_path, &record.source_path).map_err(
            |e| {
                RestoreFailure::Failed(
                    record.destination_path.clone(),
                    format!("Failed to restore file: {}", e),
                )
            },
        )?;

        Ok(backup)
    }

    fn remove_created_folder(folder: &Path, report: &mut UndoReport) {
        if !folder.is_dir() {
            return;
        }
        let is_empty = match fs::read_dir(folder) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                report
                    .failed_restores
                    .push((folder.to_path_buf(), format!("Could not inspect folder: {}", e)));
                return;
            }
        };

        if !is_empty {
            tracing::info!("Keeping non-empty folder: {}", folder.display());
            report.folders_kept.push(folder.to_path_buf());
            return;
        }

        match fs::remove_dir(folder) {
            Ok(()) => {
                tracing::info!("Removed empty folder: {}", folder.display());
                report.folders_removed.push(folder.to_path_buf());
            }
            Err(e) => {
                tracing::error!("Could not remove folder {}: {}", folder.display(), e);
                report
                    .failed_restores
                    .push((folder.to_path_buf(), format!("Could not remove folder: {}", e)));
            }
        }
    }

    /// Appends a timestamp to a file name.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let backup_name = format!("{}.bak.{}", filename, timestamp);

        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }

    /// Rewrites the whole history through a temporary file and a rename.
    fn write_operations(&self, operations: &[OperationRecord]) -> LedgerResult<()> {
        let write_error = |source: std::io::Error| LedgerError::Write {
            path: self.history_file.clone(),
            source,
        };

        if let Some(parent) = self.history_file.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let temp_path = self.history_file.with_extension("json.tmp");
        let file = File::create(&temp_path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, operations)
            .map_err(|e| write_error(std::io::Error::other(e)))?;
        writer.flush().map_err(write_error)?;
        writer.get_ref().sync_all().map_err(write_error)?;

        fs::rename(&temp_path, &self.history_file).map_err(write_error)
    }
}

enum RestoreFailure {
    Missing(PathBuf),
    Failed(PathBuf, String),
}
