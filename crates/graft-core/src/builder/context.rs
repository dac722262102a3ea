use crate::classify::Classifier;
use crate::compiler::Compiler;
use crate::config::{BuildConfig, ConfigError};
use crate::error::Result;
use crate::fetch::{Fetch, HttpFetcher, ModuleCache};
use crate::graph::RemoteOptions;
use crate::import_map::ImportMap;
use crate::resolver::ResolverCache;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Everything a build shares across steps and entrypoints.
///
/// The resolver cache lives here, so its lifetime is one build.
pub struct BuildContext<F = HttpFetcher> {
    config: BuildConfig,
    import_map: ImportMap,
    classifier: Classifier,
    resolver_cache: ResolverCache,
    module_cache: Option<ModuleCache>,
    fetcher: Option<F>,
    compiler: Arc<dyn Compiler>,
    remote: RemoteOptions,
}

impl BuildContext<HttpFetcher> {
    /// Create a context that fetches remote modules over HTTP.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the import map
    /// cannot be loaded, or the HTTP client cannot be created.
    pub fn new(config: BuildConfig, compiler: Arc<dyn Compiler>) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new()?;
        Self::with_fetcher(config, compiler, Some(fetcher))
    }
}

impl<F: Fetch> BuildContext<F> {
    /// Create a context with a custom fetcher, or none to stay offline.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the import map
    /// cannot be loaded.
    pub fn with_fetcher(
        config: BuildConfig,
        compiler: Arc<dyn Compiler>,
        fetcher: Option<F>,
    ) -> Result<Self> {
        config.validate()?;

        let base = Url::from_directory_path(&config.root).map_err(|()| {
            ConfigError::InvalidBaseUrl {
                path: config.root.clone(),
            }
        })?;
        let import_map = match config.import_map_path() {
            Some(path) => ImportMap::load(&path, base)?,
            None => ImportMap::empty(base),
        };
        tracing::debug!(entries = import_map.len(), "Import map loaded");

        let classifier = Classifier::from_config(&config)?;
        let module_cache = config.cache.then(ModuleCache::default);
        let remote = RemoteOptions::from_config(&config);

        Ok(Self {
            config,
            import_map,
            classifier,
            resolver_cache: ResolverCache::new(),
            module_cache,
            fetcher,
            compiler,
            remote,
        })
    }

    /// Re-anchor the import map at `dest` after sources were copied there.
    ///
    /// Resolutions cached against the old anchor are dropped.
    ///
    /// # Errors
    /// Returns an error if `dest` cannot be expressed as a directory URL.
    pub fn rebase_import_map(&mut self, dest: &Path) -> Result<()> {
        if dest == self.config.root {
            return Ok(());
        }
        let base = Url::from_directory_path(dest).map_err(|()| ConfigError::InvalidBaseUrl {
            path: dest.to_path_buf(),
        })?;
        self.import_map = self.import_map.rebase(base).map_err(|e| ConfigError::ImportMapParse {
            path: self.config.import_map_path().unwrap_or_default(),
            message: e.to_string(),
        })?;
        self.resolver_cache = ResolverCache::new();
        tracing::debug!(base = %self.import_map.base_url(), "Import map rebased");
        Ok(())
    }

    /// Replace the module cache (e.g. to point it at a scratch directory).
    #[must_use]
    pub fn with_module_cache(mut self, cache: Option<ModuleCache>) -> Self {
        self.module_cache = cache;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    #[must_use]
    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub fn resolver_cache(&self) -> &ResolverCache {
        &self.resolver_cache
    }

    #[must_use]
    pub fn module_cache(&self) -> Option<&ModuleCache> {
        self.module_cache.as_ref()
    }

    #[must_use]
    pub fn fetcher(&self) -> Option<&F> {
        self.fetcher.as_ref()
    }

    #[must_use]
    pub fn compiler(&self) -> &dyn Compiler {
        self.compiler.as_ref()
    }

    #[must_use]
    pub fn remote(&self) -> &RemoteOptions {
        &self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::{CountingCompiler, NoFetch};
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_relative_root() {
        let config = BuildConfig::new("relative", "/abs/out");
        let result = BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::RelativePath { field: "root", .. }))
        ));
    }

    #[test]
    fn test_missing_import_map_is_config_error() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path(), dir.path().join("dist"))
            .with_import_map("import_map.json");
        let result = BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::ImportMapRead { .. }))
        ));
    }

    #[test]
    fn test_invalid_import_map_is_config_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("import_map.json"), "{ nope").unwrap();
        let config = BuildConfig::new(dir.path(), dir.path().join("dist"))
            .with_import_map("import_map.json");
        let result = BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::ImportMapParse { .. }))
        ));
    }

    #[test]
    fn test_rebase_import_map_follows_output() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("import_map.json"),
            r#"{"imports": {"utils": "./lib/utils.ts"}}"#,
        )
        .unwrap();
        let dist = dir.path().join("dist");
        let config = BuildConfig::new(dir.path(), &dist).with_import_map("import_map.json");
        let mut ctx =
            BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None).unwrap();

        ctx.rebase_import_map(&dist).unwrap();

        let expected = Url::from_directory_path(&dist).unwrap();
        assert_eq!(ctx.import_map().base_url(), &expected);
        let referrer = expected.join("app.js").unwrap();
        assert_eq!(
            ctx.import_map().resolve("utils", &referrer).matched(),
            Some(expected.join("lib/utils.ts").unwrap())
        );
    }

    #[test]
    fn test_rebase_import_map_onto_root_is_noop() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path(), dir.path().join("dist"));
        let mut ctx =
            BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None).unwrap();
        let before = ctx.import_map().base_url().clone();
        ctx.rebase_import_map(dir.path()).unwrap();
        assert_eq!(ctx.import_map().base_url(), &before);
    }

    #[test]
    fn test_import_map_loaded_relative_to_root() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("import_map.json"),
            r#"{"imports": {"react": "https://esm.sh/react@18"}}"#,
        )
        .unwrap();
        let config = BuildConfig::new(dir.path(), dir.path().join("dist"))
            .with_import_map("import_map.json")
            .with_cache(false);
        let ctx =
            BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None).unwrap();
        assert_eq!(ctx.import_map().len(), 1);
        assert!(ctx.module_cache().is_none());
        assert!(ctx.resolver_cache().is_empty());
    }
}
