//! Per-category file counts and sizes for a directory.

use crate::file_organizer::{FileOrganizer, OrganizeResult};
use crate::filters::probe_size;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub count: usize,
    pub bytes: u64,
}

/// What an organize run would sort, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStatistics {
    pub total_files: usize,
    pub total_bytes: u64,
    pub categories: BTreeMap<String, CategoryStats>,
}

impl DirectoryStatistics {
    /// Counts the candidate files of `source_dir`. Unreadable sizes count as zero bytes.
    pub fn collect(organizer: &FileOrganizer<'_>, source_dir: &Path) -> OrganizeResult<Self> {
        let mut stats = Self::default();
        for file_name in organizer.candidate_files(source_dir)? {
            let bytes = probe_size(&source_dir.join(&file_name))
                .available()
                .unwrap_or(0);
            let category = organizer.resolver().category_for_file(&file_name);

            let entry = stats.categories.entry(category.to_string()).or_default();
            entry.count += 1;
            entry.bytes += bytes;
            stats.total_files += 1;
            stats.total_bytes += bytes;
        }
        Ok(stats)
    }

    /// Categories ordered by file count, largest first, then by name.
    pub fn sorted_by_count(&self) -> Vec<(&str, CategoryStats)> {
        let mut rows: Vec<_> = self
            .categories
            .iter()
            .map(|(name, stats)| (name.as_str(), *stats))
            .collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

/// Formats a byte count with one decimal: `512.0 B`, `1.5 KB`, `2.0 GB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryMap;
    use crate::filters::FileFilterChain;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }

    #[test]
    fn test_collect_groups_by_category() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.png"), "1234").unwrap();
        fs::write(base.join("b.jpg"), "12").unwrap();
        fs::write(base.join("c.txt"), "1").unwrap();
        fs::create_dir(base.join("Images")).unwrap();

        let chain = FileFilterChain::new();
        let organizer = FileOrganizer::new(&CategoryMap::default(), &chain);
        let stats = DirectoryStatistics::collect(&organizer, base).unwrap();

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_bytes, 7);
        assert_eq!(stats.categories["Images"], CategoryStats { count: 2, bytes: 6 });

        let rows = stats.sorted_by_count();
        assert_eq!(rows[0].0, "Images");
        assert_eq!(rows[1].0, "Documents");
    }
}
