//! File categorization by extension.
//!
//! A [`CategoryMap`] is an ordered list of named categories, each owning a set of
//! lowercase, dot-prefixed extensions. Resolution walks the map in order and the
//! first category claiming an extension wins; anything unclaimed lands in the
//! reserved [`FALLBACK_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use tidydir::file_category::{CategoryMap, CategoryResolver};
//!
//! let resolver = CategoryResolver::new(CategoryMap::default());
//! assert_eq!(resolver.category_for_extension(".png"), "Images");
//! assert_eq!(resolver.category_for_file("photo.JPG"), "Images");
//! assert_eq!(resolver.category_for_file("notes.xyz"), "Others");
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path};

/// Name of the catch-all category. It can be edited but never removed or renamed.
pub const FALLBACK_CATEGORY: &str = "Others";

/// One named category and the extensions it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: String,
    pub extensions: Vec<String>,
}

impl CategoryRule {
    /// Builds a rule, normalizing every extension and dropping duplicates.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, extensions: &[S]) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(extensions.len());
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref());
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            name: name.into(),
            extensions: normalized,
        }
    }

    /// A rule claiming no extensions.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
        }
    }

    pub fn claims(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

/// Ordered mapping from category name to extensions.
///
/// Order matters: when two categories claim the same extension the earlier one
/// wins. The map serializes as a JSON/TOML object whose key order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    rules: Vec<CategoryRule>,
}

impl CategoryMap {
    /// Creates an empty map. Resolution still falls back to [`FALLBACK_CATEGORY`].
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<CategoryRule>) -> Self {
        let mut map = Self::empty();
        for rule in rules {
            map.upsert(rule);
        }
        map
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Inserts a rule, replacing a same-named rule in place (keeping its position).
    pub fn upsert(&mut self, rule: CategoryRule) {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// Replaces the rule named `old_name` with `rule` at the same position.
    ///
    /// Returns `false` if `old_name` is unknown.
    pub fn replace(&mut self, old_name: &str, rule: CategoryRule) -> bool {
        match self.rules.iter().position(|r| r.name == old_name) {
            Some(index) => {
                self.rules[index] = rule;
                true
            }
            None => false,
        }
    }

    /// Removes a rule by name, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<CategoryRule> {
        let index = self.rules.iter().position(|r| r.name == name)?;
        Some(self.rules.remove(index))
    }

    /// Appends an empty fallback rule if the map has none.
    pub fn ensure_fallback(&mut self) {
        if !self.contains(FALLBACK_CATEGORY) {
            self.rules.push(CategoryRule::empty(FALLBACK_CATEGORY));
        }
    }

    /// First category (in map order) claiming `extension`, if any.
    pub fn lookup(&self, extension: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.claims(extension))
            .map(|rule| rule.name.as_str())
    }
}

impl Default for CategoryMap {
    /// The built-in category set.
    fn default() -> Self {
        Self::from_rules(vec![
            CategoryRule::new(
                "Images",
                &[
                    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".svg", ".webp", ".ico",
                ],
            ),
            CategoryRule::new(
                "Documents",
                &[
                    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf",
                    ".odt", ".ods", ".odp",
                ],
            ),
            CategoryRule::new(
                "Videos",
                &[
                    ".mp4", ".mov", ".avi", ".mkv", ".wmv", ".flv", ".webm", ".m4v", ".3gp",
                ],
            ),
            CategoryRule::new(
                "Audio",
                &[".mp3", ".wav", ".aac", ".ogg", ".flac", ".m4a", ".wma"],
            ),
            CategoryRule::new(
                "Compressed Files",
                &[".zip", ".rar", ".tar", ".gz", ".7z", ".bz2", ".xz"],
            ),
            CategoryRule::new(
                "Executables and Installers",
                &[".exe", ".msi", ".dmg", ".pkg", ".deb", ".rpm", ".appimage"],
            ),
            CategoryRule::new(
                "Scripts",
                &[
                    ".py", ".js", ".sh", ".bat", ".java", ".c", ".cpp", ".cs", ".html", ".css",
                    ".php", ".rb", ".go", ".rs",
                ],
            ),
            CategoryRule::new("Spreadsheets", &[".csv", ".tsv"]),
            CategoryRule::new("Presentations", &[".key"]),
            CategoryRule::new("E-books", &[".epub", ".mobi", ".azw", ".azw3", ".fb2"]),
            CategoryRule::new("Fonts", &[".ttf", ".otf", ".woff", ".woff2", ".eot"]),
            CategoryRule::empty(FALLBACK_CATEGORY),
        ])
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.name, &rule.extensions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = CategoryMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to extension lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = CategoryMap::empty();
                while let Some((name, extensions)) = access.next_entry::<String, Vec<String>>()? {
                    map.upsert(CategoryRule::new(name, &extensions));
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CategoryMapVisitor)
    }
}

/// Resolves extensions against a fixed snapshot of a [`CategoryMap`].
///
/// The resolver owns its snapshot, so configuration edits made after a batch
/// starts never change decisions inside that batch.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    snapshot: CategoryMap,
}

impl CategoryResolver {
    /// Takes the snapshot, dropping rules whose name is not a plain folder name.
    pub fn new(mut snapshot: CategoryMap) -> Self {
        snapshot.rules.retain(|rule| {
            let valid = is_folder_name(&rule.name);
            if !valid {
                tracing::warn!("Ignoring category '{}': not a plain folder name", rule.name);
            }
            valid
        });
        Self { snapshot }
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.snapshot
    }

    /// Maps a lowercase, dot-prefixed extension to its category name.
    pub fn category_for_extension(&self, extension: &str) -> &str {
        self.snapshot.lookup(extension).unwrap_or(FALLBACK_CATEGORY)
    }

    /// Maps a file name to its category, ignoring extension case.
    pub fn category_for_file(&self, file_name: &str) -> &str {
        self.category_for_extension(&file_extension(file_name))
    }
}

/// True if `name` is exactly one normal path component, so that joining it to
/// a directory names a direct child of that directory.
pub fn is_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part == name,
        _ => false,
    }
}

/// Lowercases an extension and makes sure it starts with a dot.
///
/// Surrounding whitespace is trimmed; an empty input stays empty.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Splits a file name into `(base, extension)`, the extension keeping its dot.
///
/// Leading dots belong to the base, so `.bashrc` has no extension, while
/// `archive.tar.gz` splits as `("archive.tar", ".gz")`.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    let leading_dots = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name.rfind('.') {
        Some(index) if index > leading_dots => file_name.split_at(index),
        _ => (file_name, ""),
    }
}

/// Lowercase extension (with its dot) of a file name, or `""` if it has none.
pub fn file_extension(file_name: &str) -> String {
    split_extension(file_name).1.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_folder_name() {
        assert!(is_folder_name("Images"));
        assert!(is_folder_name("Compressed Files"));
        assert!(!is_folder_name(""));
        assert!(!is_folder_name(".."));
        assert!(!is_folder_name("."));
        assert!(!is_folder_name("/tmp"));
        assert!(!is_folder_name("Docs/2024"));
        assert!(!is_folder_name("Docs/"));
    }

    #[test]
    fn test_resolver_ignores_path_like_categories() {
        let map = CategoryMap::from_rules(vec![
            CategoryRule::new("..", &[".zz"]),
            CategoryRule::new("Docs/2024", &[".qq"]),
            CategoryRule::new("Images", &[".png"]),
        ]);
        let resolver = CategoryResolver::new(map);
        assert_eq!(resolver.category_for_file("n.zz"), FALLBACK_CATEGORY);
        assert_eq!(resolver.category_for_file("n.qq"), FALLBACK_CATEGORY);
        assert_eq!(resolver.category_for_file("a.png"), "Images");
        assert_eq!(resolver.categories().len(), 1);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension(".config.json"), (".config", ".json"));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
    }

    #[test]
    fn test_file_extension_is_lowercase() {
        assert_eq!(file_extension("photo.JPG"), ".jpg");
        assert_eq!(file_extension("Makefile"), "");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("PDF"), ".pdf");
        assert_eq!(normalize_extension(".Txt"), ".txt");
        assert_eq!(normalize_extension("  md "), ".md");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_default_categories() {
        let resolver = CategoryResolver::new(CategoryMap::default());
        assert_eq!(resolver.category_for_extension(".png"), "Images");
        assert_eq!(resolver.category_for_extension(".pdf"), "Documents");
        assert_eq!(resolver.category_for_extension(".mp3"), "Audio");
        assert_eq!(resolver.category_for_extension(".zip"), "Compressed Files");
        assert_eq!(resolver.category_for_extension(".rs"), "Scripts");
    }

    #[test]
    fn test_mixed_case_extension_resolves() {
        let resolver = CategoryResolver::new(CategoryMap::default());
        assert_eq!(resolver.category_for_file("photo.JPG"), "Images");
        assert_eq!(resolver.category_for_file("Song.Mp3"), "Audio");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let resolver = CategoryResolver::new(CategoryMap::default());
        assert_eq!(resolver.category_for_file("data.xyz"), FALLBACK_CATEGORY);
        assert_eq!(resolver.category_for_file("LICENSE"), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_first_match_wins() {
        let map = CategoryMap::from_rules(vec![
            CategoryRule::new("Reports", &[".pdf"]),
            CategoryRule::new("Documents", &[".pdf", ".txt"]),
        ]);
        let resolver = CategoryResolver::new(map);
        assert_eq!(resolver.category_for_extension(".pdf"), "Reports");
        assert_eq!(resolver.category_for_extension(".txt"), "Documents");
    }

    #[test]
    fn test_empty_map_still_falls_back() {
        let resolver = CategoryResolver::new(CategoryMap::empty());
        assert_eq!(resolver.category_for_extension(".png"), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut map = CategoryMap::from_rules(vec![
            CategoryRule::new("A", &[".a"]),
            CategoryRule::new("B", &[".b"]),
        ]);
        map.upsert(CategoryRule::new("A", &[".aa"]));
        let names: Vec<_> = map.names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(map.lookup(".aa"), Some("A"));
        assert_eq!(map.lookup(".a"), None);
    }

    #[test]
    fn test_rule_normalizes_and_dedups() {
        let rule = CategoryRule::new("Docs", &["PDF", ".pdf", "txt", ""]);
        assert_eq!(rule.extensions, vec![".pdf".to_string(), ".txt".to_string()]);
    }

    #[test]
    fn test_serde_preserves_order() {
        let json = r#"{"Zeta": [".z"], "Alpha": ["A"], "Others": []}"#;
        let map: CategoryMap = serde_json::from_str(json).unwrap();
        let names: Vec<_> = map.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Others"]);
        assert_eq!(map.lookup(".a"), Some("Alpha"));

        let back = serde_json::to_string(&map).unwrap();
        assert_eq!(back, r#"{"Zeta":[".z"],"Alpha":[".a"],"Others":[]}"#);
    }

    #[test]
    fn test_ensure_fallback() {
        let mut map = CategoryMap::from_rules(vec![CategoryRule::new("Images", &[".png"])]);
        map.ensure_fallback();
        assert!(map.contains(FALLBACK_CATEGORY));
        map.ensure_fallback();
        assert_eq!(map.len(), 2);
    }
}
