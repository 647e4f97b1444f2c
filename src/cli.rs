//! Command-line interface for tidydir.
//!
//! Parses arguments with `clap` and wires each subcommand to the library:
//! organizing, previewing, statistics, history, undo and category management.

use crate::category_settings::SettingsError;
use crate::config::{AppConfig, ConfigError};
use crate::file_organizer::{FileOrganizer, OrganizeError};
use crate::output::OutputFormatter;
use crate::preview::{PreviewEngine, PreviewSummary};
use crate::statistics::DirectoryStatistics;
use crate::undo::LedgerError;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "tidydir", version, about = "Sort a directory's files into category folders")]
pub struct Cli {
    /// Configuration file to use instead of the discovered one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show info-level log records on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move the files of a directory into category folders
    Organize {
        directory: PathBuf,
        /// Do not record the run in the undo history
        #[arg(long)]
        no_record: bool,
    },
    /// Show where each file would go without moving anything
    Preview { directory: PathBuf },
    /// Count files and bytes per category
    Stats { directory: PathBuf },
    /// List recorded operations
    History,
    /// Undo an operation (the most recent undoable one by default)
    Undo { id: Option<String> },
    /// Manage categories
    #[command(subcommand)]
    Categories(CategoryCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CategoryCommand {
    List,
    /// Add a category or replace the extensions of an existing one
    Add {
        name: String,
        #[arg(required = true)]
        extensions: Vec<String>,
    },
    /// Rename a category and/or replace its extensions
    Edit {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        extensions: Vec<String>,
    },
    Remove { name: String },
    /// Restore the built-in categories
    Reset,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("Nothing to undo")]
    NothingToUndo,
}

/// Runs one command against the given configuration.
///
/// # Examples
///
/// ```no_run
/// use tidydir::cli::{Command, run_cli};
/// use tidydir::config::AppConfig;
///
/// let config = AppConfig::load(None).unwrap_or_default();
/// if let Err(e) = run_cli(Command::History, &config) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: Command, config: &AppConfig) -> Result<(), CliError> {
    match command {
        Command::Organize {
            directory,
            no_record,
        } => organize(&directory, !no_record, config),
        Command::Preview { directory } => preview(&directory, config),
        Command::Stats { directory } => stats(&directory, config),
        Command::History => {
            OutputFormatter::history_table(&config.ledger().try_load_operations()?);
            Ok(())
        }
        Command::Undo { id } => undo(id, config),
        Command::Categories(command) => categories(command, config),
    }
}

fn organize(directory: &Path, record: bool, config: &AppConfig) -> Result<(), CliError> {
    if !directory.is_dir() {
        return Err(OrganizeError::InvalidDirectory(directory.to_path_buf()).into());
    }
    let settings = config.category_settings();
    let filters = config.filter_chain();
    let ledger = config.ledger();
    let organizer = FileOrganizer::new(settings.categories(), &filters).with_ledger(&ledger);

    let progress_bar = OutputFormatter::create_progress_bar();
    let mut on_progress = |percent: f64| progress_bar.set_position(percent.round() as u64);
    let outcome = organizer.organize(directory, Some(&mut on_progress), record);
    progress_bar.finish_and_clear();

    for line in &outcome.log {
        OutputFormatter::log_line(line);
    }
    if let Some(id) = &outcome.operation_id {
        OutputFormatter::info(&format!(
            "Recorded as {}. Run 'tidydir undo {}' to revert.",
            id, id
        ));
    }
    Ok(())
}

fn preview(directory: &Path, config: &AppConfig) -> Result<(), CliError> {
    let settings = config.category_settings();
    let filters = config.filter_chain();
    let organizer = FileOrganizer::new(settings.categories(), &filters);

    let items = PreviewEngine::new(&organizer).try_generate_preview(directory)?;
    if items.is_empty() {
        OutputFormatter::warning(crate::file_organizer::NOTHING_TO_ORGANIZE);
        return Ok(());
    }
    OutputFormatter::preview_table(&items, &PreviewSummary::from_items(&items));
    Ok(())
}

fn stats(directory: &Path, config: &AppConfig) -> Result<(), CliError> {
    let settings = config.category_settings();
    let filters = config.filter_chain();
    let organizer = FileOrganizer::new(settings.categories(), &filters);

    let stats = DirectoryStatistics::collect(&organizer, directory)?;
    OutputFormatter::statistics_table(&stats);
    Ok(())
}

fn undo(id: Option<String>, config: &AppConfig) -> Result<(), CliError> {
    let ledger = config.ledger();
    let id = match id {
        Some(id) => id,
        None => ledger
            .latest_undoable()
            .map(|record| record.id)
            .ok_or(CliError::NothingToUndo)?,
    };

    OutputFormatter::info(&format!("Undoing operation {}", id));
    let report = ledger.undo_operation(&id)?;
    OutputFormatter::undo_report(&report);
    if !report.is_complete_success() {
        OutputFormatter::warning("Undo was only partially successful.");
    }
    Ok(())
}

fn categories(command: CategoryCommand, config: &AppConfig) -> Result<(), CliError> {
    let mut settings = config.category_settings();
    match command {
        CategoryCommand::List => {}
        CategoryCommand::Add { name, extensions } => {
            settings.add_category(&name, &extensions)?;
            OutputFormatter::success(&format!("Saved category '{}'", name.trim()));
        }
        CategoryCommand::Edit {
            name,
            rename,
            extensions,
        } => {
            let new_name = rename.unwrap_or_else(|| name.clone());
            let extensions = if extensions.is_empty() {
                settings
                    .categories()
                    .get(&name)
                    .map(|rule| rule.extensions.clone())
                    .unwrap_or_default()
            } else {
                extensions
            };
            settings.edit_category(&name, &new_name, &extensions)?;
            OutputFormatter::success(&format!("Updated category '{}'", new_name.trim()));
        }
        CategoryCommand::Remove { name } => {
            settings.remove_category(&name)?;
            OutputFormatter::success(&format!("Removed category '{}'", name));
        }
        CategoryCommand::Reset => {
            settings.reset_to_defaults()?;
            OutputFormatter::success("Categories reset to defaults");
        }
    }
    OutputFormatter::category_list(settings.categories());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organize() {
        let cli = Cli::try_parse_from(["tidydir", "organize", "/tmp/x", "--no-record"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Organize {
                directory: PathBuf::from("/tmp/x"),
                no_record: true,
            }
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tidydir", "undo", "--config", "/tmp/c.toml", "20250101_000000_000000"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(
            cli.command,
            Command::Undo {
                id: Some("20250101_000000_000000".to_string())
            }
        );
    }

    #[test]
    fn test_parse_category_add_requires_extensions() {
        assert!(Cli::try_parse_from(["tidydir", "categories", "add", "Designs"]).is_err());
        let cli =
            Cli::try_parse_from(["tidydir", "categories", "add", "Designs", ".psd", "ai"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Categories(CategoryCommand::Add {
                name: "Designs".to_string(),
                extensions: vec![".psd".to_string(), "ai".to_string()],
            })
        );
    }
}
