use super::SourceFile;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// A set of sources keyed by absolute path.
///
/// Adding a source whose path is already present replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCollection {
    items: BTreeMap<PathBuf, SourceFile>,
}

impl SourceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: SourceFile) -> &mut Self {
        self.items.insert(source.path().to_path_buf(), source);
        self
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.items.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut SourceFile> {
        self.items.get_mut(path)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.items.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.items.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.items.keys().map(PathBuf::as_path)
    }

    pub fn find(&self, mut predicate: impl FnMut(&SourceFile) -> bool) -> Option<&SourceFile> {
        self.items.values().find(|source| predicate(source))
    }

    /// The source named by `url`, physically or through its alias.
    #[must_use]
    pub fn find_by_url(&self, url: &Url) -> Option<&SourceFile> {
        self.find(|source| source.matches_url(url))
    }

    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(&SourceFile) -> bool) -> Self {
        self.items
            .values()
            .filter(|source| predicate(source))
            .cloned()
            .collect()
    }

    /// Union keyed by path; entries from `other` win.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for source in other.iter() {
            merged.add(source.clone());
        }
        merged
    }
}

impl FromIterator<SourceFile> for SourceCollection {
    fn from_iter<I: IntoIterator<Item = SourceFile>>(iter: I) -> Self {
        let mut collection = Self::new();
        for source in iter {
            collection.add(source);
        }
        collection
    }
}

impl IntoIterator for SourceCollection {
    type Item = SourceFile;
    type IntoIter = std::collections::btree_map::IntoValues<PathBuf, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str) -> SourceFile {
        SourceFile::new(path, "/project")
    }

    #[test]
    fn test_add_deduplicates_by_path() {
        let mut sources = SourceCollection::new();
        sources.add(source("/project/a.ts"));
        sources.add(source("/project/a.ts").with_alias("a.js"));
        assert_eq!(sources.len(), 1);
        assert_eq!(
            sources
                .get(Path::new("/project/a.ts"))
                .and_then(SourceFile::relative_alias),
            Some("a.js")
        );
    }

    #[test]
    fn test_merge_later_entries_win() {
        let left: SourceCollection = [source("/project/a.ts"), source("/project/b.ts")]
            .into_iter()
            .collect();
        let mut compiled = source("/project/a.ts");
        compiled.set_content("compiled");
        let right: SourceCollection = [compiled].into_iter().collect();

        let merged = left.merge(&right);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.get(Path::new("/project/a.ts")).and_then(SourceFile::content),
            Some("compiled")
        );
        // Inputs are untouched
        assert!(left.get(Path::new("/project/a.ts")).unwrap().content().is_none());
    }

    #[test]
    fn test_filter_and_find() {
        let sources: SourceCollection = [source("/project/a.ts"), source("/project/b.css")]
            .into_iter()
            .collect();
        let ts = sources.filter(|s| s.extension() == Some("ts"));
        assert_eq!(ts.len(), 1);
        assert!(sources.find(|s| s.relative_path() == "b.css").is_some());
        assert!(sources.find(|s| s.relative_path() == "c.css").is_none());
    }

    #[test]
    fn test_find_by_url() {
        let sources: SourceCollection = [source("/project/lib/a.ts")].into_iter().collect();
        let url = Url::parse("file:///project/lib/a.ts").unwrap();
        assert!(sources.find_by_url(&url).is_some());
        let missing = Url::parse("file:///project/lib/b.ts").unwrap();
        assert!(sources.find_by_url(&missing).is_none());
    }
}
