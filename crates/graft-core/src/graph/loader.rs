use super::engine::{Load, LoadResponse};
use super::lexer::scan_module;
use super::remote::{prepare_remote_url, RemoteOptions};
use super::GraphError;
use crate::fetch::{Fetch, ModuleCache};
use crate::import_map::ImportMap;
use crate::resolver::{is_bare_specifier, is_remote_url};
use crate::sources::SourceCollection;
use url::Url;

/// Facades of facades are followed at most this many times.
const MAX_FACADE_DEPTH: usize = 8;

/// Loads modules for one entrypoint's graph.
///
/// Local sources win over the module cache, which wins over the network.
/// Specifiers arrive already resolved, so a bare import is requested by its
/// import map target. Facade modules are replaced by the module they wrap.
pub struct ModuleLoader<'a, F> {
    sources: &'a SourceCollection,
    import_map: &'a ImportMap,
    cache: Option<&'a ModuleCache>,
    fetcher: Option<&'a F>,
    remote: &'a RemoteOptions,
}

impl<'a, F: Fetch> ModuleLoader<'a, F> {
    #[must_use]
    pub fn new(
        sources: &'a SourceCollection,
        import_map: &'a ImportMap,
        remote: &'a RemoteOptions,
    ) -> Self {
        Self {
            sources,
            import_map,
            cache: None,
            fetcher: None,
            remote,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Option<&'a ModuleCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Option<&'a F>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Local sources, then the module cache, then the network.
    async fn load_raw(&self, specifier: &str) -> Result<Option<LoadResponse>, GraphError> {
        let Ok(url) = Url::parse(specifier) else {
            return Ok(None);
        };

        if let Some(source) = self.sources.find_by_url(&url) {
            let content = source.read().await.map_err(|e| GraphError::Io {
                specifier: specifier.to_string(),
                source: e,
            })?;
            return Ok(Some(LoadResponse::new(specifier, content)));
        }

        if !is_remote_url(&url) {
            return Ok(None);
        }

        if let Some(cache) = self.cache {
            if let Some(hit) = cache.get(specifier).await {
                return Ok(Some(hit));
            }
        }

        let Some(fetcher) = self.fetcher else {
            tracing::warn!(specifier, "Remote module not cached and fetching is disabled");
            return Ok(None);
        };
        let response = fetcher.fetch(&url).await?;

        if let (Some(cache), Some(response)) = (self.cache, &response) {
            if let Err(e) = cache.put(specifier, response) {
                tracing::warn!(specifier, error = %e, "Failed to cache module");
            }
        }
        Ok(response)
    }

    /// URL of the one module a facade re-exports.
    fn facade_target(&self, response: &LoadResponse) -> Option<String> {
        let info = scan_module(&response.content);
        let target = info.facade_target()?;
        let base = Url::parse(&response.specifier).ok()?;

        let url = if is_bare_specifier(target) {
            self.import_map.resolve(target, &base).matched()?
        } else {
            base.join(target).ok()?
        };
        let url: String = prepare_remote_url(&url, self.remote).into();
        (url != response.specifier).then_some(url)
    }
}

impl<F: Fetch> Load for ModuleLoader<'_, F> {
    async fn load(
        &self,
        specifier: &str,
        is_dynamic: bool,
    ) -> Result<Option<LoadResponse>, GraphError> {
        tracing::debug!(specifier, is_dynamic, "Load");

        let Some(mut response) = self.load_raw(specifier).await? else {
            return Ok(None);
        };

        for _ in 0..MAX_FACADE_DEPTH {
            let Some(target) = self.facade_target(&response) else {
                break;
            };
            match self.load_raw(&target).await? {
                Some(inner) => {
                    tracing::debug!(facade = %response.specifier, target = %inner.specifier, "Facade resolved");
                    response = inner;
                }
                None => break,
            }
        }

        Ok(Some(response))
    }
}
