//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables.

use crate::file_category::{CategoryMap, FALLBACK_CATEGORY};
use crate::preview::{PreviewItem, PreviewSummary};
use crate::statistics::{DirectoryStatistics, format_file_size};
use crate::undo::{OperationRecord, OperationStatus, UndoReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidydir::output::OutputFormatter;
    /// OutputFormatter::success("Organization completed.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a percentage progress bar for an organize run.
    ///
    /// The bar is driven by the organizer's progress callback, so its length is 100.
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Colors one line of an organize log by what it reports.
    pub fn log_line(line: &str) {
        if line.starts_with("Error") || line.starts_with("Unexpected") {
            Self::error(line);
        } else if line.starts_with("Moved:") {
            Self::success(line);
        } else if line.starts_with("Folder created:") || line.starts_with("Name collision") {
            Self::info(line);
        } else if line.starts_with("No files") || line.starts_with("Undo information") {
            Self::warning(line);
        } else {
            Self::plain(line);
        }
    }

    /// Prints the planned moves of a preview and its totals.
    pub fn preview_table(items: &[PreviewItem], summary: &PreviewSummary) {
        Self::header("PREVIEW");

        let name_width = items
            .iter()
            .map(|item| item.original_name.len())
            .max()
            .unwrap_or(0)
            .max(4);

        for item in items {
            let destination = format!("{}/{}", item.category, item.final_name);
            let size = item
                .file_size
                .map(format_file_size)
                .unwrap_or_else(|| "?".to_string());
            let line = format!(
                "{:<width$} -> {} ({})",
                item.original_name,
                destination,
                size,
                width = name_width
            );
            if item.will_rename {
                println!("{} {}", line, "[renamed]".yellow());
            } else {
                println!("{}", line);
            }
        }

        println!("{}", "-".repeat(name_width + 20));
        println!(
            "{} files into {} categories, {} renamed, {} total",
            summary.files.to_string().green().bold(),
            summary.categories,
            summary.renamed,
            format_file_size(summary.total_bytes)
        );
    }

    /// Prints a summary table with file counts and sizes by category.
    pub fn statistics_table(stats: &DirectoryStatistics) {
        Self::header("STATISTICS");

        let rows = stats.sorted_by_count();
        let max_category_len = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {:>6} | {}",
            "Category".bold(),
            "Files".bold(),
            "Size".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 22));

        for (category, entry) in &rows {
            println!(
                "{:<width$} | {:>6} | {}",
                category,
                entry.count.to_string().green(),
                format_file_size(entry.bytes),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 22));
        println!(
            "{:<width$} | {:>6} | {}",
            "Total".bold(),
            stats.total_files.to_string().green().bold(),
            format_file_size(stats.total_bytes),
            width = max_category_len
        );
    }

    /// Prints the operation history, newest first.
    pub fn history_table(records: &[OperationRecord]) {
        Self::header("HISTORY");
        if records.is_empty() {
            Self::plain("No operations recorded.");
            return;
        }

        for record in records.iter().rev() {
            let status = match record.status {
                OperationStatus::Active => "active".green(),
                OperationStatus::PartiallyUndone => "partially undone".yellow(),
                OperationStatus::Undone => "undone".dimmed(),
            };
            println!(
                "{}  {}  {} files, {} folders  [{}]  {}",
                record.id.bold(),
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.files_moved,
                record.folders_created_count,
                status,
                record.source_directory.display()
            );
        }
    }

    pub fn undo_report(report: &UndoReport) {
        Self::header("UNDO");
        Self::success(&format!("Restored {} files", report.restored_files));

        for path in &report.backups {
            Self::warning(&format!("Existing file kept as {}", path.display()));
        }
        for path in &report.folders_kept {
            Self::warning(&format!("Folder not empty, kept: {}", path.display()));
        }
        for (path, reason) in &report.skipped_files {
            Self::warning(&format!("Skipped {}: {}", path.display(), reason));
        }
        for (path, reason) in &report.failed_restores {
            Self::error(&format!("{}: {}", path.display(), reason));
        }
    }

    pub fn category_list(categories: &CategoryMap) {
        Self::header("CATEGORIES");
        for rule in categories.rules() {
            let extensions = if rule.name == FALLBACK_CATEGORY && rule.extensions.is_empty() {
                "(everything else)".dimmed().to_string()
            } else {
                rule.extensions.join(" ")
            };
            println!("{}: {}", rule.name.bold(), extensions);
        }
    }
}
