use crate::config::{EntrypointConfig, Target};
use crate::graph::ModuleGraph;
use crate::resolver::BareSpecifierMap;
use crate::sources::SourceFile;
use std::collections::BTreeMap;
use url::Url;

/// A source promoted to graph root for one build target.
#[derive(Debug, Clone)]
pub struct Entrypoint {
    pub source: SourceFile,
    /// Output subdirectory from the registry.
    pub output: String,
    pub target: Target,
    /// Attached once the graph has been built.
    pub graph: Option<ModuleGraph>,
    /// Bare specifiers met while building the graph.
    pub bare_specifiers: BareSpecifierMap,
}

impl Entrypoint {
    #[must_use]
    pub fn new(source: SourceFile, config: &EntrypointConfig) -> Self {
        Self {
            source,
            output: config.output.clone(),
            target: config.target,
            graph: None,
            bare_specifiers: BareSpecifierMap::new(),
        }
    }

    #[must_use]
    pub fn logical_path(&self) -> String {
        self.source.logical_path()
    }

    /// URL the graph is rooted at.
    #[must_use]
    pub fn root_url(&self) -> Option<Url> {
        self.source.logical_url()
    }

    #[must_use]
    pub fn graph(&self) -> Option<&ModuleGraph> {
        self.graph.as_ref()
    }

    /// Bare specifiers mapped to the URLs their modules were finally loaded from.
    #[must_use]
    pub fn resolved_bare_specifiers(&self) -> BTreeMap<String, String> {
        let reconciled = self.bare_specifiers.clone();
        if let Some(graph) = &self.graph {
            reconciled.apply_redirects(&graph.redirects);
        }
        reconciled.entries()
    }
}
