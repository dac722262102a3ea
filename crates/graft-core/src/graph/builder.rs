//! Module graph construction for one entrypoint.

use super::engine::{create_graph, Resolve};
use super::loader::ModuleLoader;
use super::model::ModuleGraph;
use super::remote::{prepare_remote_url, RemoteOptions};
use crate::builder::{BuildContext, Entrypoint};
use crate::config::ConfigError;
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::resolver::{BareSpecifierMap, ResolveError, SpecifierResolver};
use crate::sources::SourceCollection;
use url::Url;

/// [`SpecifierResolver`] plus CDN URL normalization.
pub struct GraphResolver<'a> {
    inner: SpecifierResolver<'a>,
    remote: &'a RemoteOptions,
}

impl<'a> GraphResolver<'a> {
    #[must_use]
    pub fn new(inner: SpecifierResolver<'a>, remote: &'a RemoteOptions) -> Self {
        Self { inner, remote }
    }

    #[must_use]
    pub fn inner(&self) -> &SpecifierResolver<'a> {
        &self.inner
    }
}

impl Resolve for GraphResolver<'_> {
    fn resolve(&self, specifier: &str, referrer: &str) -> std::result::Result<String, ResolveError> {
        let resolved = self.inner.resolve(specifier, referrer)?;
        let Ok(url) = Url::parse(&resolved) else {
            return Ok(resolved);
        };

        let prepared = prepare_remote_url(&url, self.remote);
        if prepared == url {
            return Ok(resolved);
        }

        let prepared = String::from(prepared);
        let bare = self.inner.bare_specifiers();
        if bare.get(specifier).as_deref() == Some(resolved.as_str()) {
            bare.record(specifier, &prepared);
        }
        Ok(prepared)
    }
}

/// Build `entrypoint`'s module graph and attach it, with its bare specifier map.
///
/// # Errors
/// Returns an error if the entrypoint has no URL or any load or resolution fails.
pub async fn build_module_graph<'e, F: Fetch>(
    ctx: &BuildContext<F>,
    sources: &SourceCollection,
    entrypoint: &'e mut Entrypoint,
) -> Result<&'e ModuleGraph> {
    let logical = entrypoint.logical_path();
    let root = entrypoint
        .root_url()
        .ok_or_else(|| ConfigError::InvalidBaseUrl {
            path: entrypoint.source.path().to_path_buf(),
        })?;

    tracing::info!(entrypoint = %logical, root = %root, "Building module graph");

    let bare = BareSpecifierMap::new();
    let graph = {
        let resolver = GraphResolver::new(
            SpecifierResolver::new(ctx.import_map(), sources, ctx.resolver_cache(), &bare),
            ctx.remote(),
        );
        let loader = ModuleLoader::new(sources, ctx.import_map(), ctx.remote())
            .with_cache(ctx.module_cache())
            .with_fetcher(ctx.fetcher());

        let graph = create_graph(&[root.to_string()], &loader, &resolver)
            .await
            .map_err(|source| Error::Graph {
                entrypoint: logical.clone(),
                source,
            })?;

        let stats = resolver.inner().stats();
        tracing::debug!(
            entrypoint = %logical,
            modules = graph.len(),
            cache_hits = stats.cache_hits,
            import_map_lookups = stats.import_map_lookups,
            local_lookups = stats.local_lookups,
            "Module graph built"
        );
        graph
    };

    entrypoint.bare_specifiers = bare;
    Ok(entrypoint.graph.insert(graph))
}
