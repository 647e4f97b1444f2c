//! Candidate file filtering.
//!
//! A [`FileFilterChain`] is an ordered list of named, individually toggleable
//! [`FileFilter`]s. A file survives the chain only if every *enabled* filter
//! accepts it; disabled filters keep their configuration but are skipped.
//!
//! Filters never fail. A predicate that cannot evaluate a file (unreadable
//! metadata, invalid regex or glob) rejects that file instead. Filters are
//! declared in TOML alongside the rest of the configuration:
//!
//! ```toml
//! [[filters]]
//! name = "exclude_hidden"
//! kind = "hidden"
//!
//! [[filters]]
//! name = "pdf_and_text"
//! kind = "extension"
//! extensions = ["pdf", ".txt"]
//!
//! [[filters]]
//! name = "recent"
//! kind = "date"
//! timestamp = "modified"
//! from = "2024-01-01"
//! enabled = false
//! ```

use crate::file_category::{CategoryResolver, file_extension, normalize_extension};
use chrono::{DateTime, Local, NaiveDate};
use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Outcome of reading a piece of file metadata.
///
/// `Unavailable` is an expected result (permissions, races, unsupported
/// timestamps) rather than an error; filters treat it as "exclude".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Probe<T> {
    fn from_io(result: std::io::Result<T>) -> Self {
        match result {
            Ok(value) => Probe::Available(value),
            Err(e) => Probe::Unavailable(e.to_string()),
        }
    }

    pub fn available(self) -> Option<T> {
        match self {
            Probe::Available(value) => Some(value),
            Probe::Unavailable(_) => None,
        }
    }
}

/// Size of a file in bytes.
pub fn probe_size(path: &Path) -> Probe<u64> {
    Probe::from_io(fs::metadata(path).map(|m| m.len()))
}

/// One of the file's timestamps, in local time.
pub fn probe_timestamp(path: &Path, kind: TimestampKind) -> Probe<DateTime<Local>> {
    let time: std::io::Result<SystemTime> = fs::metadata(path).and_then(|m| match kind {
        TimestampKind::Modified => m.modified(),
        TimestampKind::Created => m.created(),
        TimestampKind::Accessed => m.accessed(),
    });
    Probe::from_io(time.map(DateTime::<Local>::from))
}

/// Which file timestamp a [`DateFilter`] looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    #[default]
    Modified,
    Created,
    Accessed,
}

/// Keeps files whose extension is in the list (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFilter {
    pub extensions: Vec<String>,
}

/// Keeps files whose size lies in `[min_size, max_size]` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeFilter {
    #[serde(default)]
    pub min_size: Option<u64>,
    #[serde(default)]
    pub max_size: Option<u64>,
}

/// Keeps files whose timestamp falls on a day in `[from, to]` (local time, both inclusive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(default)]
    pub timestamp: TimestampKind,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateFilter {
    /// Parses a `YYYY-MM-DD` bound.
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatchMode {
    #[default]
    Substring,
    Regex,
    Glob,
}

/// Keeps files whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter {
    pub pattern: String,
    #[serde(default)]
    pub mode: NameMatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Keeps files that resolve to one of the listed categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub categories: Vec<String>,
}

/// A single filter predicate with its strongly-typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFilter {
    Extension(ExtensionFilter),
    Size(SizeFilter),
    Date(DateFilter),
    Name(NameFilter),
    Category(CategoryFilter),
    /// Rejects names starting with a dot.
    Hidden,
}

fn enabled_by_default() -> bool {
    true
}

/// A filter plus its name and on/off switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFilter {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub filter: FileFilter,
}

/// Ordered set of named filters applied conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFilterChain {
    filters: Vec<NamedFilter>,
}

impl FileFilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a chain from filter entries; later entries replace same-named earlier ones.
    pub fn from_filters(filters: impl IntoIterator<Item = NamedFilter>) -> Self {
        let mut chain = Self::new();
        for entry in filters {
            chain.insert(entry);
        }
        chain
    }

    pub fn filters(&self) -> &[NamedFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Adds an enabled filter. A filter with the same name is replaced in place.
    pub fn add_filter(&mut self, name: impl Into<String>, filter: FileFilter) {
        self.insert(NamedFilter {
            name: name.into(),
            enabled: true,
            filter,
        });
    }

    fn insert(&mut self, entry: NamedFilter) {
        match self.filters.iter_mut().find(|f| f.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.filters.push(entry),
        }
    }

    /// Removes a filter by name. Returns whether it existed.
    pub fn remove_filter(&mut self, name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.name != name);
        self.filters.len() != before
    }

    /// Toggles a filter without dropping its configuration. Returns whether it existed.
    pub fn enable_filter(&mut self, name: &str, enabled: bool) -> bool {
        match self.filters.iter_mut().find(|f| f.name == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Compiles the enabled filters for evaluation.
    pub fn compile(&self) -> CompiledChain {
        let predicates = self
            .filters
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| Predicate::compile(&entry.name, &entry.filter))
            .collect();
        CompiledChain { predicates }
    }

    /// Returns the candidates accepted by every enabled filter, in their original order.
    pub fn apply<S: AsRef<str>>(
        &self,
        candidates: &[S],
        source_dir: &Path,
        resolver: &CategoryResolver,
    ) -> Vec<String> {
        let compiled = self.compile();
        candidates
            .iter()
            .map(|candidate| candidate.as_ref())
            .filter(|name| compiled.accepts(name, source_dir, resolver))
            .map(str::to_string)
            .collect()
    }
}

/// Enabled filters with patterns compiled, ready to evaluate files.
#[derive(Debug)]
pub struct CompiledChain {
    predicates: Vec<Predicate>,
}

impl CompiledChain {
    /// True if every enabled predicate accepts the file.
    pub fn accepts(&self, file_name: &str, source_dir: &Path, resolver: &CategoryResolver) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.accepts(file_name, source_dir, resolver))
    }
}

#[derive(Debug)]
enum NameMatcher {
    Substring { needle: String, case_sensitive: bool },
    Regex(Regex),
    Glob { pattern: Pattern, options: MatchOptions },
    /// The pattern did not compile; nothing matches.
    Invalid,
}

impl NameMatcher {
    fn compile(filter_name: &str, filter: &NameFilter) -> Self {
        match filter.mode {
            NameMatchMode::Substring => NameMatcher::Substring {
                needle: if filter.case_sensitive {
                    filter.pattern.clone()
                } else {
                    filter.pattern.to_lowercase()
                },
                case_sensitive: filter.case_sensitive,
            },
            NameMatchMode::Regex => match RegexBuilder::new(&filter.pattern)
                .case_insensitive(!filter.case_sensitive)
                .build()
            {
                Ok(regex) => NameMatcher::Regex(regex),
                Err(e) => {
                    tracing::warn!(
                        "Filter '{}': invalid regex '{}': {}. It will exclude every file.",
                        filter_name,
                        filter.pattern,
                        e
                    );
                    NameMatcher::Invalid
                }
            },
            NameMatchMode::Glob => match Pattern::new(&filter.pattern) {
                Ok(pattern) => NameMatcher::Glob {
                    pattern,
                    options: MatchOptions {
                        case_sensitive: filter.case_sensitive,
                        require_literal_separator: false,
                        require_literal_leading_dot: false,
                    },
                },
                Err(e) => {
                    tracing::warn!(
                        "Filter '{}': invalid glob '{}': {}. It will exclude every file.",
                        filter_name,
                        filter.pattern,
                        e
                    );
                    NameMatcher::Invalid
                }
            },
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        match self {
            NameMatcher::Substring {
                needle,
                case_sensitive: true,
            } => file_name.contains(needle.as_str()),
            NameMatcher::Substring { needle, .. } => {
                file_name.to_lowercase().contains(needle.as_str())
            }
            NameMatcher::Regex(regex) => regex.is_match(file_name),
            NameMatcher::Glob { pattern, options } => pattern.matches_with(file_name, *options),
            NameMatcher::Invalid => false,
        }
    }
}

#[derive(Debug)]
enum Predicate {
    Extension(HashSet<String>),
    Size {
        min: Option<u64>,
        max: Option<u64>,
    },
    Date {
        kind: TimestampKind,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    Name(NameMatcher),
    Category(HashSet<String>),
    Hidden,
}

impl Predicate {
    fn compile(name: &str, filter: &FileFilter) -> Self {
        match filter {
            FileFilter::Extension(f) => Predicate::Extension(
                f.extensions
                    .iter()
                    .map(|ext| normalize_extension(ext))
                    .collect(),
            ),
            FileFilter::Size(f) => Predicate::Size {
                min: f.min_size,
                max: f.max_size,
            },
            FileFilter::Date(f) => Predicate::Date {
                kind: f.timestamp,
                from: f.from,
                to: f.to,
            },
            FileFilter::Name(f) => Predicate::Name(NameMatcher::compile(name, f)),
            FileFilter::Category(f) => Predicate::Category(f.categories.iter().cloned().collect()),
            FileFilter::Hidden => Predicate::Hidden,
        }
    }

    fn accepts(&self, file_name: &str, source_dir: &Path, resolver: &CategoryResolver) -> bool {
        match self {
            Predicate::Extension(extensions) => extensions.contains(&file_extension(file_name)),
            Predicate::Size { min, max } => match probe_size(&source_dir.join(file_name)) {
                Probe::Available(size) => {
                    min.is_none_or(|min| size >= min) && max.is_none_or(|max| size <= max)
                }
                Probe::Unavailable(reason) => {
                    tracing::debug!("Size of '{}' unavailable: {}", file_name, reason);
                    false
                }
            },
            Predicate::Date { kind, from, to } => {
                match probe_timestamp(&source_dir.join(file_name), *kind) {
                    Probe::Available(time) => {
                        let day = time.date_naive();
                        from.is_none_or(|from| day >= from) && to.is_none_or(|to| day <= to)
                    }
                    Probe::Unavailable(reason) => {
                        tracing::debug!("Timestamp of '{}' unavailable: {}", file_name, reason);
                        false
                    }
                }
            }
            Predicate::Name(matcher) => matcher.matches(file_name),
            Predicate::Category(categories) => {
                categories.contains(resolver.category_for_file(file_name))
            }
            Predicate::Hidden => !file_name.starts_with('.'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryMap;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn resolver() -> CategoryResolver {
        CategoryResolver::new(CategoryMap::default())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn write_file(dir: &TempDir, name: &str, size: usize) {
        fs::write(dir.path().join(name), vec![b'x'; size]).unwrap();
    }

    fn name_filter(pattern: &str, mode: NameMatchMode, case_sensitive: bool) -> FileFilter {
        FileFilter::Name(NameFilter {
            pattern: pattern.to_string(),
            mode,
            case_sensitive,
        })
    }

    #[test]
    fn test_empty_chain_accepts_everything() {
        let dir = TempDir::new().unwrap();
        let input = names(&["a.txt", ".hidden", "b.png"]);
        let chain = FileFilterChain::new();
        assert_eq!(chain.apply(&input, dir.path(), &resolver()), input);
    }

    #[test]
    fn test_extension_filter_normalizes() {
        let dir = TempDir::new().unwrap();
        let mut chain = FileFilterChain::new();
        chain.add_filter(
            "ext",
            FileFilter::Extension(ExtensionFilter {
                extensions: names(&["PDF", ".txt"]),
            }),
        );
        let output = chain.apply(
            &names(&["a.pdf", "b.TXT", "c.png", "d"]),
            dir.path(),
            &resolver(),
        );
        assert_eq!(output, names(&["a.pdf", "b.TXT"]));
    }

    #[test]
    fn test_size_filter_bounds_and_unreadable() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "small.bin", 10);
        write_file(&dir, "medium.bin", 100);
        write_file(&dir, "large.bin", 1000);

        let mut chain = FileFilterChain::new();
        chain.add_filter(
            "size",
            FileFilter::Size(SizeFilter {
                min_size: Some(50),
                max_size: Some(1000),
            }),
        );
        let output = chain.apply(
            &names(&["small.bin", "medium.bin", "large.bin", "missing.bin"]),
            dir.path(),
            &resolver(),
        );
        assert_eq!(output, names(&["medium.bin", "large.bin"]));
    }

    #[test]
    fn test_size_filter_open_ended() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "small.bin", 10);
        write_file(&dir, "large.bin", 1000);

        let mut chain = FileFilterChain::new();
        chain.add_filter(
            "size",
            FileFilter::Size(SizeFilter {
                min_size: None,
                max_size: Some(10),
            }),
        );
        let output = chain.apply(&names(&["small.bin", "large.bin"]), dir.path(), &resolver());
        assert_eq!(output, names(&["small.bin"]));
    }

    #[test]
    fn test_date_filter_on_modified_time() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "old.txt", 1);
        write_file(&dir, "new.txt", 1);

        let old = Local::now() - chrono::Duration::days(400);
        filetime::set_file_mtime(
            dir.path().join("old.txt"),
            FileTime::from_unix_time(old.timestamp(), 0),
        )
        .unwrap();

        let cutoff = (Local::now() - chrono::Duration::days(30)).date_naive();
        let mut chain = FileFilterChain::new();
        chain.add_filter(
            "recent",
            FileFilter::Date(DateFilter {
                timestamp: TimestampKind::Modified,
                from: Some(cutoff),
                to: None,
            }),
        );
        let output = chain.apply(
            &names(&["old.txt", "new.txt", "gone.txt"]),
            dir.path(),
            &resolver(),
        );
        assert_eq!(output, names(&["new.txt"]));

        chain.add_filter(
            "recent",
            FileFilter::Date(DateFilter {
                timestamp: TimestampKind::Modified,
                from: None,
                to: Some(cutoff),
            }),
        );
        let output = chain.apply(&names(&["old.txt", "new.txt"]), dir.path(), &resolver());
        assert_eq!(output, names(&["old.txt"]));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            DateFilter::parse_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(DateFilter::parse_date("29/02/2024"), None);
    }

    #[test]
    fn test_name_filter_substring() {
        let dir = TempDir::new().unwrap();
        let input = names(&["Report-2024.pdf", "report_old.txt", "photo.png"]);

        let mut chain = FileFilterChain::new();
        chain.add_filter("name", name_filter("REPORT", NameMatchMode::Substring, false));
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["Report-2024.pdf", "report_old.txt"])
        );

        chain.add_filter("name", name_filter("Report", NameMatchMode::Substring, true));
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["Report-2024.pdf"])
        );
    }

    #[test]
    fn test_name_filter_regex() {
        let dir = TempDir::new().unwrap();
        let input = names(&["IMG_0001.jpg", "img_0002.jpg", "screenshot.png"]);

        let mut chain = FileFilterChain::new();
        chain.add_filter("name", name_filter(r"^img_\d+", NameMatchMode::Regex, false));
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["IMG_0001.jpg", "img_0002.jpg"])
        );

        chain.add_filter("name", name_filter(r"^img_\d+", NameMatchMode::Regex, true));
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["img_0002.jpg"])
        );
    }

    #[test]
    fn test_invalid_regex_excludes_everything() {
        let dir = TempDir::new().unwrap();
        let mut chain = FileFilterChain::new();
        chain.add_filter("name", name_filter("[invalid(", NameMatchMode::Regex, false));
        let output = chain.apply(&names(&["a.txt", "b.txt"]), dir.path(), &resolver());
        assert!(output.is_empty());
    }

    #[test]
    fn test_name_filter_glob() {
        let dir = TempDir::new().unwrap();
        let input = names(&["draft1.docx", "draft22.docx", "final.docx"]);

        let mut chain = FileFilterChain::new();
        chain.add_filter("name", name_filter("DRAFT?.docx", NameMatchMode::Glob, false));
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["draft1.docx"])
        );

        chain.add_filter("name", name_filter("[unclosed", NameMatchMode::Glob, false));
        assert!(chain.apply(&input, dir.path(), &resolver()).is_empty());
    }

    #[test]
    fn test_category_filter() {
        let dir = TempDir::new().unwrap();
        let mut chain = FileFilterChain::new();
        chain.add_filter(
            "category",
            FileFilter::Category(CategoryFilter {
                categories: names(&["Images", "Others"]),
            }),
        );
        let output = chain.apply(
            &names(&["a.PNG", "b.pdf", "c.xyz", "d.mp3"]),
            dir.path(),
            &resolver(),
        );
        assert_eq!(output, names(&["a.PNG", "c.xyz"]));
    }

    #[test]
    fn test_hidden_filter() {
        let dir = TempDir::new().unwrap();
        let mut chain = FileFilterChain::new();
        chain.add_filter("hidden", FileFilter::Hidden);
        let output = chain.apply(
            &names(&[".DS_Store", "visible.txt", ".env"]),
            dir.path(),
            &resolver(),
        );
        assert_eq!(output, names(&["visible.txt"]));
    }

    #[test]
    fn test_conjunction_with_disabled_filter() {
        let dir = TempDir::new().unwrap();
        let input = names(&["b.pdf", ".a.pdf", "c.png", "d.pdf"]);

        let mut chain = FileFilterChain::new();
        chain.add_filter("hidden", FileFilter::Hidden);
        chain.add_filter(
            "ext",
            FileFilter::Extension(ExtensionFilter {
                extensions: names(&[".pdf"]),
            }),
        );
        chain.add_filter("name", name_filter("d.", NameMatchMode::Substring, true));
        chain.enable_filter("name", false);

        let output = chain.apply(&input, dir.path(), &resolver());
        assert_eq!(output, names(&["b.pdf", "d.pdf"]));

        // Filtering is idempotent.
        assert_eq!(chain.apply(&output, dir.path(), &resolver()), output);

        chain.enable_filter("name", true);
        assert_eq!(
            chain.apply(&input, dir.path(), &resolver()),
            names(&["d.pdf"])
        );
        assert_eq!(chain.filters().len(), 3);
    }

    #[test]
    fn test_manage_filters() {
        let mut chain = FileFilterChain::new();
        chain.add_filter("hidden", FileFilter::Hidden);
        chain.add_filter("size", FileFilter::Size(SizeFilter::default()));
        chain.add_filter(
            "hidden",
            FileFilter::Extension(ExtensionFilter { extensions: vec![] }),
        );

        let order: Vec<_> = chain.filters().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["hidden", "size"]);
        assert!(!chain.enable_filter("missing", false));
        assert!(chain.remove_filter("size"));
        assert!(!chain.remove_filter("size"));
        chain.clear();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_filters_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            filters: FileFilterChain,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[filters]]
            name = "exclude_hidden"
            kind = "hidden"

            [[filters]]
            name = "docs"
            kind = "extension"
            extensions = ["pdf"]
            enabled = false

            [[filters]]
            name = "window"
            kind = "date"
            timestamp = "accessed"
            from = "2024-01-01"

            [[filters]]
            name = "screens"
            kind = "name"
            pattern = "screenshot*"
            mode = "glob"

            [[filters]]
            name = "big"
            kind = "size"
            min_size = 1024
            "#,
        )
        .unwrap();

        let filters = doc.filters.filters();
        assert_eq!(filters.len(), 5);
        assert_eq!(filters[0].filter, FileFilter::Hidden);
        assert!(filters[0].enabled);
        assert!(!filters[1].enabled);
        assert_eq!(
            filters[2].filter,
            FileFilter::Date(DateFilter {
                timestamp: TimestampKind::Accessed,
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: None,
            })
        );
        assert!(matches!(
            &filters[3].filter,
            FileFilter::Name(NameFilter { mode: NameMatchMode::Glob, case_sensitive: false, .. })
        ));
        assert_eq!(
            filters[4].filter,
            FileFilter::Size(SizeFilter {
                min_size: Some(1024),
                max_size: None,
            })
        );
    }
}
