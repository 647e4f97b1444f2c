//! Dry-run planning.
//!
//! [`PreviewEngine`] walks the same candidates an organize run would and reports
//! where each file would land, without touching the filesystem. Names already
//! planned earlier in the batch count as taken, so the predicted renames match
//! what [`FileOrganizer::organize`] does on an unchanged directory.

use crate::file_category::file_extension;
use crate::file_organizer::{FileOrganizer, OrganizeResult, resolve_collision};
use crate::filters::{TimestampKind, probe_size, probe_timestamp};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Planned outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub original_name: String,
    pub final_name: String,
    pub category: String,
    pub source_path: PathBuf,
    pub destination_folder: PathBuf,
    pub destination_path: PathBuf,
    pub file_size: Option<u64>,
    pub modified: Option<DateTime<Local>>,
    pub extension: String,
    pub will_rename: bool,
}

/// Totals over a preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewSummary {
    pub files: usize,
    pub categories: usize,
    pub renamed: usize,
    /// Sum of the sizes that could be read.
    pub total_bytes: u64,
}

impl PreviewSummary {
    pub fn from_items(items: &[PreviewItem]) -> Self {
        let categories: BTreeSet<&str> = items.iter().map(|i| i.category.as_str()).collect();
        Self {
            files: items.len(),
            categories: categories.len(),
            renamed: items.iter().filter(|i| i.will_rename).count(),
            total_bytes: items.iter().filter_map(|i| i.file_size).sum(),
        }
    }
}

pub struct PreviewEngine<'a> {
    organizer: &'a FileOrganizer<'a>,
}

impl<'a> PreviewEngine<'a> {
    pub fn new(organizer: &'a FileOrganizer<'a>) -> Self {
        Self { organizer }
    }

    /// Plans the placement of every candidate file of `source_dir`.
    ///
    /// An invalid or unreadable directory yields an empty plan.
    pub fn generate_preview(&self, source_dir: &Path) -> Vec<PreviewItem> {
        self.try_generate_preview(source_dir).unwrap_or_else(|e| {
            tracing::warn!("Preview unavailable: {}", e);
            Vec::new()
        })
    }

    /// Like [`generate_preview`](Self::generate_preview), but reports why the
    /// directory could not be listed.
    pub fn try_generate_preview(&self, source_dir: &Path) -> OrganizeResult<Vec<PreviewItem>> {
        let resolver = self.organizer.resolver();
        let mut planned: HashSet<PathBuf> = HashSet::new();
        let mut items = Vec::new();

        for file_name in self.organizer.candidate_files(source_dir)? {
            let category = resolver.category_for_file(&file_name).to_string();
            let destination_folder = source_dir.join(&category);
            let final_name = resolve_collision(&destination_folder, &file_name, |path| {
                planned.contains(path) || path.exists()
            });
            let destination_path = destination_folder.join(&final_name);
            planned.insert(destination_path.clone());

            let source_path = source_dir.join(&file_name);
            items.push(PreviewItem {
                file_size: probe_size(&source_path).available(),
                modified: probe_timestamp(&source_path, TimestampKind::Modified).available(),
                extension: file_extension(&file_name),
                will_rename: final_name != file_name,
                original_name: file_name,
                final_name,
                category,
                source_path,
                destination_folder,
                destination_path,
            });
        }

        tracing::debug!("Preview of {} planned {} moves", source_dir.display(), items.len());
        Ok(items)
    }
}
