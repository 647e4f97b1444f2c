/// Moves the files of a directory into category subfolders.
///
/// A run lists the regular files directly inside the source directory, keeps
/// those accepted by the filter chain, and moves each one into
/// `<source>/<category>/`. Name clashes inside a category folder are resolved
/// with a `_<n>` suffix. Every step is written to the run's log and to
/// `tracing`; per-file failures are logged and skipped.
use crate::file_category::{CategoryMap, CategoryResolver, split_extension};
use crate::filters::FileFilterChain;
use crate::undo::{MoveRecord, OperationDraft, OperationLedger};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NOTHING_TO_ORGANIZE: &str = "No files found to organize (after applying filters).";
pub const ORGANIZATION_COMPLETED: &str = "Organization completed.";
pub const NOTHING_CHANGED: &str =
    "No files were moved or new folders created (possibly already organized or errors occurred).";

#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("The directory '{}' does not exist or is invalid.", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("Error creating folder {}: {source}", .path.display())]
    FolderCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error moving '{file_name}': {source}")]
    Move {
        file_name: String,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read directory {}: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What an organize run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeOutcome {
    pub files_moved: usize,
    pub folders_created: usize,
    /// Human-readable log of the run, one line per entry.
    pub log: Vec<String>,
    /// Id of the history record, when one was written.
    pub operation_id: Option<String>,
}

impl OrganizeOutcome {
    pub fn log_text(&self) -> String {
        self.log.join("\n")
    }

    fn push(&mut self, line: String) {
        self.log.push(line);
    }
}

/// Organizes one directory at a time against a fixed category snapshot.
///
/// The categories are cloned on construction and the filter chain is borrowed,
/// so neither can change while a run is in progress.
#[derive(Debug)]
pub struct FileOrganizer<'a> {
    resolver: CategoryResolver,
    filters: &'a FileFilterChain,
    ledger: Option<&'a OperationLedger>,
}

impl<'a> FileOrganizer<'a> {
    pub fn new(categories: &CategoryMap, filters: &'a FileFilterChain) -> Self {
        Self {
            resolver: CategoryResolver::new(categories.clone()),
            filters,
            ledger: None,
        }
    }

    /// Records changing runs in `ledger` so they can be undone.
    pub fn with_ledger(mut self, ledger: &'a OperationLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn resolver(&self) -> &CategoryResolver {
        &self.resolver
    }

    /// Regular files directly inside `source_dir` that pass the filter chain, sorted by name.
    ///
    /// Subdirectories (including category folders from earlier runs) are never candidates.
    pub fn candidate_files(&self, source_dir: &Path) -> OrganizeResult<Vec<String>> {
        if !source_dir.is_dir() {
            return Err(OrganizeError::InvalidDirectory(source_dir.to_path_buf()));
        }

        let entries = fs::read_dir(source_dir).map_err(|e| OrganizeError::ReadDirectory {
            path: source_dir.to_path_buf(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let Some(entry) = readable_entry(source_dir, entry) else {
                continue;
            };
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("Skipping file with non UTF-8 name: {:?}", raw),
            }
        }
        names.sort();

        Ok(self.filters.apply(&names, source_dir, &self.resolver))
    }

    /// Moves every candidate file of `source_dir` into its category folder.
    ///
    /// `progress` receives `(index / total) * 100` after each file is handled,
    /// with `index` starting at 1. A history record is written only when
    /// `record_operation` is set, a ledger is attached, and the run moved a file
    /// or created a folder.
    ///
    /// The run itself does not fail: an invalid directory yields a single log
    /// line, and per-file problems are logged and skipped.
    pub fn organize(
        &self,
        source_dir: &Path,
        mut progress: Option<&mut dyn FnMut(f64)>,
        record_operation: bool,
    ) -> OrganizeOutcome {
        let mut outcome = OrganizeOutcome::default();

        let candidates = match self.candidate_files(source_dir) {
            Ok(candidates) => candidates,
            Err(e @ OrganizeError::InvalidDirectory(_)) => {
                tracing::error!("{}", e);
                outcome.push(e.to_string());
                return outcome;
            }
            Err(e) => {
                let line = format!("Unexpected error during organization: {}", e);
                tracing::error!("{}", line);
                outcome.push(line);
                return outcome;
            }
        };

        log_line(
            &mut outcome,
            format!("Starting organization in: {}", source_dir.display()),
        );

        if candidates.is_empty() {
            log_line(&mut outcome, NOTHING_TO_ORGANIZE.to_string());
            return outcome;
        }

        let mut draft = OperationDraft {
            source_directory: source_dir.to_path_buf(),
            ..OperationDraft::default()
        };
        let total = candidates.len();

        for (index, file_name) in candidates.iter().enumerate() {
            if let Err(e) = self.organize_file(source_dir, file_name, &mut outcome, &mut draft) {
                tracing::error!("{}", e);
                outcome.push(e.to_string());
            }

            if let Some(report) = progress.as_mut() {
                report((index + 1) as f64 / total as f64 * 100.0);
            }
        }

        if outcome.files_moved == 0 && outcome.folders_created == 0 {
            log_line(&mut outcome, NOTHING_CHANGED.to_string());
            return outcome;
        }

        if record_operation && let Some(ledger) = self.ledger {
            outcome.operation_id = ledger.save_operation(draft);
            if outcome.operation_id.is_none() {
                log_line(
                    &mut outcome,
                    "Undo information could not be saved for this run.".to_string(),
                );
            }
        }

        log_line(&mut outcome, ORGANIZATION_COMPLETED.to_string());
        outcome
    }

    fn organize_file(
        &self,
        source_dir: &Path,
        file_name: &str,
        outcome: &mut OrganizeOutcome,
        draft: &mut OperationDraft,
    ) -> OrganizeResult<()> {
        let category = self.resolver.category_for_file(file_name);
        let folder = source_dir.join(category);

        if ensure_folder(&folder)? {
            outcome.folders_created += 1;
            draft.folders_created.push(folder.clone());
            log_line(outcome, format!("Folder created: {}", folder.display()));
        }

        let final_name = resolve_collision(&folder, file_name, |path| path.exists());
        if final_name != file_name {
            log_line(
                outcome,
                format!(
                    "Name collision in '{}': '{}' will be stored as '{}'",
                    category, file_name, final_name
                ),
            );
        }

        let source_path = source_dir.join(file_name);
        let destination_path = folder.join(&final_name);
        move_file(&source_path, &destination_path).map_err(|e| OrganizeError::Move {
            file_name: file_name.to_string(),
            destination: destination_path.clone(),
            source: e,
        })?;

        outcome.files_moved += 1;
        log_line(
            outcome,
            format!("Moved: '{}' -> '{}/{}'", file_name, category, final_name),
        );
        draft.moves.push(MoveRecord {
            source_path,
            destination_path,
        });
        Ok(())
    }
}

fn log_line(outcome: &mut OrganizeOutcome, line: String) {
    tracing::info!("{}", line);
    outcome.push(line);
}

/// Creates `folder` if needed. Returns true only when this call created it.
fn ensure_folder(folder: &Path) -> OrganizeResult<bool> {
    if folder.is_dir() {
        return Ok(false);
    }
    match fs::create_dir(folder) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && folder.is_dir() => Ok(false),
        Err(e) => Err(OrganizeError::FolderCreation {
            path: folder.to_path_buf(),
            source: e,
        }),
    }
}

/// Picks a name for `file_name` inside `folder` that `is_taken` does not report.
///
/// The original name is kept when free, otherwise `<base>_<n><ext>` with the
/// smallest free `n >= 1`:
///
/// ```
/// use tidydir::file_organizer::resolve_collision;
/// use std::path::Path;
///
/// let taken = [Path::new("/d/report.pdf").to_path_buf(), Path::new("/d/report_1.pdf").to_path_buf()];
/// let name = resolve_collision(Path::new("/d"), "report.pdf", |p| taken.iter().any(|t| t == p));
/// assert_eq!(name, "report_2.pdf");
/// ```
pub fn resolve_collision(
    folder: &Path,
    file_name: &str,
    mut is_taken: impl FnMut(&Path) -> bool,
) -> String {
    if !is_taken(&folder.join(file_name)) {
        return file_name.to_string();
    }

    let (base, extension) = split_extension(file_name);
    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}{}", base, counter, extension);
        if !is_taken(&folder.join(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}

/// Renames `from` to `to`, copying and deleting when they are on different filesystems.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

fn readable_entry(dir: &Path, entry: std::io::Result<fs::DirEntry>) -> Option<fs::DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
            None
        }
    }
}

/// Copies `from` to `to` and removes `from` only once the copy succeeded.
fn copy_then_remove(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::copy(from, to)?;
    fs::remove_file(from)
}
