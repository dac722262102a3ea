use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dependency edge as written in its importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Specifier as written.
    pub specifier: String,
    /// URL it resolved to, before any redirect.
    pub resolved: String,
    pub is_dynamic: bool,
}

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub specifier: String,
    #[serde(skip)]
    pub content: String,
    pub dependencies: Vec<Dependency>,
}

/// Modules reachable from a set of roots, keyed by final URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub roots: Vec<String>,
    pub modules: BTreeMap<String, Module>,
    /// Requested URL to the URL the module was actually loaded from.
    pub redirects: BTreeMap<String, String>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new(roots: Vec<String>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Follow redirects from `specifier` to the key a module is stored under.
    #[must_use]
    pub fn resolve<'a>(&'a self, specifier: &'a str) -> &'a str {
        let mut current = specifier;
        for _ in 0..=self.redirects.len() {
            match self.redirects.get(current) {
                Some(next) if next != current => current = next.as_str(),
                _ => break,
            }
        }
        current
    }

    #[must_use]
    pub fn get(&self, specifier: &str) -> Option<&Module> {
        self.modules.get(self.resolve(specifier))
    }

    #[must_use]
    pub fn contains(&self, specifier: &str) -> bool {
        self.get(specifier).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// `(importer, imported)` pairs with redirects applied, in key order.
    #[must_use]
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.modules
            .values()
            .flat_map(|module| {
                module
                    .dependencies
                    .iter()
                    .map(move |dep| (module.specifier.as_str(), self.resolve(&dep.resolved)))
            })
            .collect()
    }

    /// Remote module URLs in the graph.
    pub fn remote_specifiers(&self) -> impl Iterator<Item = &str> {
        self.modules
            .keys()
            .map(String::as_str)
            .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
    }
}
