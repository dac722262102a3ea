//! Graph traversal.
//!
//! Loads modules breadth-first from a set of roots, scans each for its
//! imports, resolves them and queues anything new. Loads run concurrently
//! on the calling task; nothing is spawned.

use super::lexer::scan_module;
use super::model::{Dependency, Module, ModuleGraph};
use super::GraphError;
use crate::resolver::ResolveError;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Upper bound on loads in flight at once.
pub const MAX_CONCURRENT_LOADS: usize = 16;

/// A loaded module body.
///
/// `specifier` is where the content actually came from; when it differs
/// from the requested specifier the graph records a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    pub specifier: String,
    pub content: String,
}

impl LoadResponse {
    #[must_use]
    pub fn new(specifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            content: content.into(),
        }
    }
}

/// Module source provider.
#[allow(async_fn_in_trait)]
pub trait Load {
    /// Load `specifier`. `Ok(None)` means the module does not exist.
    async fn load(
        &self,
        specifier: &str,
        is_dynamic: bool,
    ) -> Result<Option<LoadResponse>, GraphError>;
}

/// Specifier resolution callback.
pub trait Resolve {
    fn resolve(&self, specifier: &str, referrer: &str) -> Result<String, ResolveError>;
}

async fn load_one<L: Load>(
    loader: &L,
    specifier: String,
    is_dynamic: bool,
) -> Result<(String, Option<LoadResponse>), GraphError> {
    let response = loader.load(&specifier, is_dynamic).await?;
    Ok((specifier, response))
}

/// Build the graph reachable from `roots`.
///
/// # Errors
/// The first failing load or resolution aborts the whole traversal.
pub async fn create_graph<L: Load, R: Resolve>(
    roots: &[String],
    loader: &L,
    resolver: &R,
) -> Result<ModuleGraph, GraphError> {
    let mut graph = ModuleGraph::new(roots.to_vec());
    let mut seen: HashSet<String> = roots.iter().cloned().collect();
    let mut queue: VecDeque<(String, bool)> = roots.iter().map(|r| (r.clone(), false)).collect();
    let mut in_flight = FuturesUnordered::new();

    loop {
        while in_flight.len() < MAX_CONCURRENT_LOADS {
            let Some((specifier, is_dynamic)) = queue.pop_front() else {
                break;
            };
            in_flight.push(load_one(loader, specifier, is_dynamic));
        }

        let Some(result) = in_flight.next().await else {
            break;
        };
        let (requested, response) = result?;
        let response = response.ok_or_else(|| GraphError::ModuleNotFound {
            specifier: requested.clone(),
        })?;

        let specifier = response.specifier;
        if specifier != requested {
            graph.redirects.insert(requested, specifier.clone());
            seen.insert(specifier.clone());
        }
        if graph.modules.contains_key(&specifier) {
            continue;
        }

        let info = scan_module(&response.content);
        let mut dependencies = Vec::with_capacity(info.imports.len());
        let mut written = HashSet::new();
        for record in info.imports {
            if !written.insert(record.specifier.clone()) {
                continue;
            }
            let resolved = resolver.resolve(&record.specifier, &specifier)?;
            if seen.insert(resolved.clone()) {
                queue.push_back((resolved.clone(), record.is_dynamic()));
            }
            dependencies.push(Dependency {
                is_dynamic: record.is_dynamic(),
                specifier: record.specifier,
                resolved,
            });
        }

        graph.modules.insert(
            specifier.clone(),
            Module {
                specifier,
                content: response.content,
                dependencies,
            },
        );
    }

    Ok(graph)
}
