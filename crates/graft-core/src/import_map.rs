//! Import map parsing and resolution.
//!
//! Parsing and lookup are delegated to the `import_map` crate. This module
//! keeps the source document so the map can be re-anchored when sources
//! move, and folds the crate's results into [`ImportMapResolution`]: a
//! specifier that hits an entry with an unusable target is *blocked* and
//! must not fall through to any other rule.

use crate::config::ConfigError;
use import_map::ImportMapOptions;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing an import map document.
#[derive(Error, Debug)]
pub enum ImportMapError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scope '{0}' must map to an object")]
    InvalidScope(String),

    #[error("{0}")]
    Invalid(String),
}

/// Outcome of an import map lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMapResolution {
    /// The specifier is mapped to this URL.
    Matched(Url),
    /// The specifier hit an entry with an unusable target.
    Blocked,
    /// No entry applies; other resolution rules may be tried.
    NoMatch,
}

impl ImportMapResolution {
    #[must_use]
    pub fn matched(self) -> Option<Url> {
        match self {
            Self::Matched(url) => Some(url),
            Self::Blocked | Self::NoMatch => None,
        }
    }
}

/// A parsed import map anchored at a base URL.
pub struct ImportMap {
    base: Url,
    source: Option<String>,
    entries: usize,
    inner: import_map::ImportMap,
}

impl ImportMap {
    /// An import map with no entries.
    #[must_use]
    pub fn empty(base: Url) -> Self {
        Self {
            inner: import_map::ImportMap::new(base.clone()),
            base,
            source: None,
            entries: 0,
        }
    }

    /// Parse an import map document relative to `base`.
    ///
    /// # Errors
    /// Returns an error if the document is not JSON of the expected shape.
    pub fn parse(text: &str, base: Url) -> Result<Self, ImportMapError> {
        let value: Value = serde_json::from_str(text)?;
        let entries = count_entries(&value)?;

        let parsed = import_map::parse_from_json_with_options(
            base.clone(),
            text,
            ImportMapOptions {
                address_hook: None,
                expand_imports: false,
            },
        )
        .map_err(|e| ImportMapError::Invalid(e.to_string()))?;
        for diagnostic in &parsed.diagnostics {
            tracing::warn!(base = %base, "Import map: {diagnostic}");
        }

        Ok(Self {
            base,
            source: Some(text.to_string()),
            entries,
            inner: parsed.import_map,
        })
    }

    /// Parse an already-decoded JSON value.
    ///
    /// # Errors
    /// Returns an error if the value is not of the expected shape.
    pub fn from_value(value: Value, base: Url) -> Result<Self, ImportMapError> {
        Self::parse(&serde_json::to_string(&value)?, base)
    }

    /// Read and parse the document at `path`.
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: &Path, base: Url) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ImportMapRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, base).map_err(|e| ConfigError::ImportMapParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The same document anchored at `base`.
    ///
    /// Relative keys, targets and scopes are normalized again, so they
    /// name locations under the new base.
    ///
    /// # Errors
    /// Returns an error if the stored document no longer parses.
    pub fn rebase(&self, base: Url) -> Result<Self, ImportMapError> {
        match &self.source {
            Some(text) => Self::parse(text, base),
            None => Ok(Self::empty(base)),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Number of entries across `imports` and all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Resolve `specifier` as imported from `referrer`.
    #[must_use]
    pub fn resolve(&self, specifier: &str, referrer: &Url) -> ImportMapResolution {
        match self.inner.resolve(specifier, referrer) {
            // URL-like specifiers come back unchanged when no entry applies
            Ok(url) if parse_url_like(specifier, referrer).as_ref() == Some(&url) => {
                ImportMapResolution::NoMatch
            }
            Ok(url) => ImportMapResolution::Matched(url),
            Err(import_map::ImportMapError::UnmappedBareSpecifier(..)) => {
                ImportMapResolution::NoMatch
            }
            Err(e) => {
                tracing::debug!(specifier, referrer = %referrer, "Import map: {e}");
                ImportMapResolution::Blocked
            }
        }
    }
}

impl fmt::Debug for ImportMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportMap")
            .field("base", &self.base.as_str())
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Count `imports` and scope entries, rejecting scopes that are not tables.
fn count_entries(document: &Value) -> Result<usize, ImportMapError> {
    let table = |key: &str| document.get(key).and_then(Value::as_object);
    let mut entries = table("imports").map_or(0, Map::len);
    if let Some(scopes) = table("scopes") {
        for (prefix, scope) in scopes {
            let Some(scope) = scope.as_object() else {
                return Err(ImportMapError::InvalidScope(prefix.clone()));
            };
            entries += scope.len();
        }
    }
    Ok(entries)
}

/// Parse `value` if it is a relative (`/`, `./`, `../`) or absolute URL.
fn parse_url_like(value: &str, base: &Url) -> Option<Url> {
    if value.starts_with('/') || value.starts_with("./") || value.starts_with("../") {
        return base.join(value).ok();
    }
    Url::parse(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("file:///project/").unwrap()
    }

    fn referrer() -> Url {
        Url::parse("file:///project/app.ts").unwrap()
    }

    fn map(json: &str) -> ImportMap {
        ImportMap::parse(json, base()).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let m = map(r#"{"imports": {"react": "https://esm.sh/react@18"}}"#);
        assert_eq!(
            m.resolve("react", &referrer()),
            ImportMapResolution::Matched(Url::parse("https://esm.sh/react@18").unwrap())
        );
    }

    #[test]
    fn test_prefix_match_appends_remainder() {
        let m = map(r#"{"imports": {"pkg/": "https://cdn/pkg@1/"}}"#);
        let resolved = m.resolve("pkg/mod.js", &referrer()).matched().unwrap();
        assert_eq!(resolved.as_str(), "https://cdn/pkg@1/mod.js");
    }

    #[test]
    fn test_exact_beats_prefix() {
        let m = map(
            r#"{"imports": {
                "pkg/": "https://cdn/pkg@1/",
                "pkg/mod.js": "https://cdn/pinned/mod.js"
            }}"#,
        );
        let resolved = m.resolve("pkg/mod.js", &referrer()).matched().unwrap();
        assert_eq!(resolved.as_str(), "https://cdn/pinned/mod.js");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let m = map(
            r#"{"imports": {
                "pkg/": "https://cdn/pkg@1/",
                "pkg/sub/": "https://other/sub/"
            }}"#,
        );
        let resolved = m.resolve("pkg/sub/x.js", &referrer()).matched().unwrap();
        assert_eq!(resolved.as_str(), "https://other/sub/x.js");
    }

    #[test]
    fn test_no_match() {
        let m = map(r#"{"imports": {"react": "https://esm.sh/react@18"}}"#);
        assert_eq!(m.resolve("vue", &referrer()), ImportMapResolution::NoMatch);
        assert_eq!(
            m.resolve("./local.ts", &referrer()),
            ImportMapResolution::NoMatch
        );
    }

    #[test]
    fn test_empty_target_is_blocked() {
        let m = map(r#"{"imports": {"blocked": "", "react": "https://esm.sh/react"}}"#);
        assert_eq!(m.resolve("blocked", &referrer()), ImportMapResolution::Blocked);
    }

    #[test]
    fn test_prefix_key_with_non_prefix_target_is_blocked() {
        let m = map(r#"{"imports": {"pkg/": "https://cdn/pkg.js"}}"#);
        assert_eq!(m.resolve("pkg/a.js", &referrer()), ImportMapResolution::Blocked);
    }

    #[test]
    fn test_backtracking_is_blocked() {
        let m = map(r#"{"imports": {"pkg/": "https://cdn/pkg/"}}"#);
        assert_eq!(
            m.resolve("pkg/../../escape.js", &referrer()),
            ImportMapResolution::Blocked
        );
    }

    #[test]
    fn test_url_like_keys_are_normalized() {
        let m = map(r#"{"imports": {"./lib/": "./vendor/lib/"}}"#);
        let resolved = m.resolve("./lib/a.js", &referrer()).matched().unwrap();
        assert_eq!(resolved.as_str(), "file:///project/vendor/lib/a.js");
    }

    #[test]
    fn test_scope_checked_first() {
        let m = map(
            r#"{
                "imports": {"react": "https://esm.sh/react@18"},
                "scopes": {
                    "./legacy/": {"react": "https://esm.sh/react@16"}
                }
            }"#,
        );
        let legacy = Url::parse("file:///project/legacy/page.ts").unwrap();
        assert_eq!(
            m.resolve("react", &legacy).matched().unwrap().as_str(),
            "https://esm.sh/react@16"
        );
        assert_eq!(
            m.resolve("react", &referrer()).matched().unwrap().as_str(),
            "https://esm.sh/react@18"
        );
    }

    #[test]
    fn test_more_specific_scope_wins() {
        let m = map(
            r#"{"scopes": {
                "./a/": {"x": "https://cdn/outer.js"},
                "./a/b/": {"x": "https://cdn/inner.js"}
            }}"#,
        );
        let inner = Url::parse("file:///project/a/b/c.ts").unwrap();
        assert_eq!(
            m.resolve("x", &inner).matched().unwrap().as_str(),
            "https://cdn/inner.js"
        );
    }

    #[test]
    fn test_blocked_in_scope_does_not_fall_through() {
        let m = map(
            r#"{
                "imports": {"react": "https://esm.sh/react@18"},
                "scopes": {"./sandbox/": {"react": ""}}
            }"#,
        );
        let sandboxed = Url::parse("file:///project/sandbox/x.ts").unwrap();
        assert_eq!(m.resolve("react", &sandboxed), ImportMapResolution::Blocked);
    }

    #[test]
    fn test_scope_must_be_object() {
        let err = ImportMap::parse(r#"{"scopes": {"./a/": "nope"}}"#, base()).unwrap_err();
        assert!(matches!(err, ImportMapError::InvalidScope(_)));
    }

    #[test]
    fn test_rebase_moves_relative_entries() {
        let m = map(
            r#"{
                "imports": {"utils": "./lib/utils.ts", "react": "https://esm.sh/react@18"},
                "scopes": {"./legacy/": {"x": "./x.ts"}}
            }"#,
        );
        let dist = m.rebase(Url::parse("file:///project/dist/").unwrap()).unwrap();
        assert_eq!(dist.base_url().as_str(), "file:///project/dist/");
        assert_eq!(dist.len(), m.len());

        let app = Url::parse("file:///project/dist/app.js").unwrap();
        assert_eq!(
            dist.resolve("utils", &app).matched().unwrap().as_str(),
            "file:///project/dist/lib/utils.ts"
        );
        assert_eq!(
            dist.resolve("react", &app).matched().unwrap().as_str(),
            "https://esm.sh/react@18"
        );

        let page = Url::parse("file:///project/dist/legacy/page.js").unwrap();
        assert_eq!(
            dist.resolve("x", &page).matched().unwrap().as_str(),
            "file:///project/dist/x.ts"
        );
        // The old scope no longer applies
        assert_eq!(
            dist.resolve("x", &Url::parse("file:///project/legacy/page.js").unwrap()),
            ImportMapResolution::NoMatch
        );
    }

    #[test]
    fn test_unmapped_absolute_url_is_no_match() {
        let m = map(r#"{"imports": {"react": "https://esm.sh/react@18"}}"#);
        assert_eq!(
            m.resolve("https://cdn.example/x.js", &referrer()),
            ImportMapResolution::NoMatch
        );
    }

    #[test]
    fn test_len_counts_scopes() {
        let m = map(
            r#"{"imports": {"a": "./a.js"}, "scopes": {"./s/": {"b": "./b.js", "c": "./c.js"}}}"#,
        );
        assert_eq!(m.len(), 3);
        assert!(ImportMap::empty(base()).is_empty());
    }
}
