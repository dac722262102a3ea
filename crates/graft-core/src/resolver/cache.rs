use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// A memoized resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub resolved: String,
    /// The result came from an import map match.
    pub via_import_map: bool,
}

/// Resolutions keyed by `(specifier, referrer)`.
///
/// Lives for one build. Concurrent writers of the same key store the same
/// value, so last-write-wins is fine.
#[derive(Debug, Default)]
pub struct ResolverCache {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl ResolverCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, specifier: &str, referrer: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(specifier.to_string(), referrer.to_string()))
            .cloned()
    }

    pub fn insert(&self, specifier: &str, referrer: &str, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert((specifier.to_string(), referrer.to_string()), entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bare specifiers seen while building one entrypoint's graph, mapped to
/// the URL they resolved to.
#[derive(Debug, Default)]
pub struct BareSpecifierMap {
    entries: RwLock<BTreeMap<String, String>>,
}

impl BareSpecifierMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, specifier: &str, resolved: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(specifier.to_string(), resolved.to_string());
    }

    #[must_use]
    pub fn get(&self, specifier: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(specifier)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, specifier: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(specifier)
    }

    /// Snapshot of all entries.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite every value through `redirects` (requested URL to final URL),
    /// following chains. Returns the number of entries that changed.
    pub fn apply_redirects(&self, redirects: &BTreeMap<String, String>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = 0;
        for value in entries.values_mut() {
            let mut target = value.as_str();
            // Bounded so a redirect cycle cannot spin forever
            for _ in 0..redirects.len() {
                match redirects.get(target) {
                    Some(next) if next != target => target = next.as_str(),
                    _ => break,
                }
            }
            if target != value.as_str() {
                let target = target.to_string();
                *value = target;
                changed += 1;
            }
        }
        changed
    }
}

impl Clone for BareSpecifierMap {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries()),
        }
    }
}

impl From<BTreeMap<String, String>> for BareSpecifierMap {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl PartialEq for BareSpecifierMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

impl serde::Serialize for BareSpecifierMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries().serialize(serializer)
    }
}
