//! Build orchestration.
//!
//! A [`Builder`] runs the pipeline steps in order:
//!
//! ```text
//! gather_sources -> clean_output -> copy_sources -> build
//!                                                   (classify -> compile_sources
//!                                                    -> hash_sources -> build_module_graphs)
//! ```
//!
//! Steps that consume copied sources refuse to run before `copy_sources`.

mod context;
mod entrypoint;
mod manifest;

pub use context::BuildContext;
pub use entrypoint::Entrypoint;
pub use manifest::{Manifest, ManifestEntrypoint, MANIFEST_FILE_NAME};

use crate::compiler::CompileOptions;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpFetcher};
use crate::graph::build_module_graph;
use crate::sources::{gather_sources, SourceCollection, SourceFile};
use std::path::Path;

/// Pipeline progress. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Uninitialized,
    SourcesGathered,
    Copied,
    Classified,
    Compiled,
    GraphsBuilt,
    Done,
}

/// Sources sorted into roles.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub entrypoints: Vec<Entrypoint>,
    pub compilable: SourceCollection,
    pub hashable: SourceCollection,
}

/// Everything a build produced.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Every source, with compiled and hashed versions merged in.
    pub sources: SourceCollection,
    pub compiled: SourceCollection,
    pub entrypoints: Vec<Entrypoint>,
    pub manifest: Manifest,
}

impl BuildResult {
    /// Look up an entrypoint by logical or relative path.
    #[must_use]
    pub fn entrypoint(&self, path: &str) -> Option<&Entrypoint> {
        self.entrypoints
            .iter()
            .find(|e| e.logical_path() == path || e.source.relative_path() == path)
    }
}

/// Runs build steps against one [`BuildContext`].
pub struct Builder<F = HttpFetcher> {
    ctx: BuildContext<F>,
    state: BuildState,
}

impl<F: Fetch> Builder<F> {
    #[must_use]
    pub fn new(ctx: BuildContext<F>) -> Self {
        Self {
            ctx,
            state: BuildState::Uninitialized,
        }
    }

    #[must_use]
    pub fn context(&self) -> &BuildContext<F> {
        &self.ctx
    }

    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    fn advance(&mut self, state: BuildState) {
        if state > self.state {
            tracing::trace!(from = ?self.state, to = ?state, "Build state");
            self.state = state;
        }
    }

    fn require_copied(&self) -> Result<()> {
        if self.state < BuildState::Copied {
            return Err(Error::SourcesNotCopied);
        }
        Ok(())
    }

    /// Walk the project root.
    ///
    /// # Errors
    /// Returns an error if the root cannot be read.
    pub async fn gather_sources(&mut self) -> Result<SourceCollection> {
        let root = self.ctx.config().root.clone();
        let sources = gather_sources(&root).map_err(|e| Error::io(&root, e))?;
        tracing::info!(count = sources.len(), root = %root.display(), "Gathered sources");
        self.advance(BuildState::SourcesGathered);
        Ok(sources)
    }

    /// Remove the output directory. Failures are ignored.
    pub async fn clean_output(&self) {
        let output = &self.ctx.config().output;
        if let Err(e) = graft_util::fs::remove_dir_if_exists(output) {
            tracing::debug!(path = %output.display(), error = %e, "Ignoring output cleanup failure");
        }
    }

    /// Copy every non-excluded source under `dest`, keeping relative paths.
    ///
    /// Returns the copied sources, rooted at `dest`. The import map is
    /// re-anchored at `dest` so its relative entries name the copies.
    ///
    /// # Errors
    /// Returns an error if a file cannot be copied.
    pub async fn copy_sources(
        &mut self,
        sources: &SourceCollection,
        dest: &Path,
    ) -> Result<SourceCollection> {
        let classifier = self.ctx.classifier();
        let mut copied = SourceCollection::new();

        for source in sources.iter() {
            if classifier.is_excluded(source) {
                tracing::trace!(path = %source.relative_path(), "Excluded");
                continue;
            }
            let target = source.rebase(dest);
            if target.path() != source.path() {
                let written = match source.content() {
                    Some(content) => graft_util::fs::atomic_write(target.path(), content.as_bytes()),
                    None => graft_util::fs::copy_file(source.path(), target.path()).map(|_| ()),
                };
                written.map_err(|e| Error::io(target.path(), e))?;
            }
            copied.add(target);
        }

        tracing::info!(count = copied.len(), dest = %dest.display(), "Copied sources");
        self.ctx.rebase_import_map(dest)?;
        self.advance(BuildState::Copied);
        Ok(copied)
    }

    /// Sort copied sources into entrypoints, compilable and hashable sets.
    ///
    /// # Errors
    /// Fails with [`Error::SourcesNotCopied`] before `copy_sources`.
    pub async fn classify(&mut self, sources: &SourceCollection) -> Result<Classification> {
        self.require_copied()?;
        let config = self.ctx.config();
        let classifier = self.ctx.classifier();
        let mut classification = Classification::default();

        for source in sources.iter() {
            if let Some(key) = classifier.matching_entrypoint(source) {
                let entry = config
                    .entrypoints
                    .get(key)
                    .ok_or_else(|| Error::UnknownEntrypoint(key.to_string()))?;
                classification
                    .entrypoints
                    .push(Entrypoint::new(source.clone(), entry));
            }
            if classifier.is_compilable(source) {
                classification.compilable.add(source.clone());
            }
            if classifier.is_hashable(source) {
                classification.hashable.add(source.clone());
            }
        }

        for key in config.entrypoints.keys() {
            let found = classification
                .entrypoints
                .iter()
                .any(|e| e.logical_path() == *key || e.source.relative_path() == *key);
            if !found && !key.contains(['*', '?', '[', '{']) {
                tracing::warn!(entrypoint = %key, "Configured entrypoint matched no source");
            }
        }

        tracing::info!(
            entrypoints = classification.entrypoints.len(),
            compilable = classification.compilable.len(),
            hashable = classification.hashable.len(),
            "Classified sources"
        );
        self.advance(BuildState::Classified);
        Ok(classification)
    }

    /// Compile each source in `sources`.
    ///
    /// # Errors
    /// Fails on the first source that does not compile.
    pub async fn compile_sources(&mut self, sources: &SourceCollection) -> Result<SourceCollection> {
        self.require_copied()?;
        let mut compiled = SourceCollection::new();
        for source in sources.iter() {
            compiled.add(self.compile_source(source).await?);
        }
        tracing::info!(
            count = compiled.len(),
            compiler = self.ctx.compiler().name(),
            "Compiled sources"
        );
        self.advance(BuildState::Compiled);
        Ok(compiled)
    }

    /// Compile one source to `output/<path>.js`.
    ///
    /// The returned source carries the compiled code and a `.js` alias.
    ///
    /// # Errors
    /// Rejects sources outside the compilable patterns with
    /// [`Error::NotCompilable`] before invoking the compiler.
    pub async fn compile_source(&self, source: &SourceFile) -> Result<SourceFile> {
        self.require_copied()?;
        if !self.ctx.classifier().is_compilable(source) {
            return Err(Error::NotCompilable {
                path: source.path().to_path_buf(),
            });
        }

        let config = self.ctx.config();
        let content = source
            .read()
            .await
            .map_err(|e| Error::io(source.path(), e))?;
        let options = CompileOptions {
            path: source.path().to_path_buf(),
            minify: config.compiler.minify,
            source_maps: config.compiler.source_maps,
            target: config.compiler.target.clone(),
        };
        let output = self
            .ctx
            .compiler()
            .compile(&content, &options)
            .map_err(|e| Error::Compile {
                path: source.path().to_path_buf(),
                source: e,
            })?;

        let alias = replace_extension(&source.relative_path(), "js");
        let out_path = config.output.join(&alias);
        let mut code = output.code;
        if let Some(map) = &output.map {
            let map_path = config.output.join(format!("{alias}.map"));
            graft_util::fs::atomic_write(&map_path, map.as_bytes())
                .map_err(|e| Error::io(&map_path, e))?;
            let map_name = map_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            code.push_str(&format!("\n//# sourceMappingURL={map_name}\n"));
        }
        graft_util::fs::atomic_write(&out_path, code.as_bytes())
            .map_err(|e| Error::io(&out_path, e))?;
        tracing::debug!(source = %source.relative_path(), output = %alias, "Compiled");

        let mut compiled = source.clone();
        compiled.set_alias(alias);
        compiled.set_content(code);
        Ok(compiled)
    }

    /// Give each source a content-hashed name and write it under that name.
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or written.
    pub async fn hash_sources(&self, sources: &SourceCollection) -> Result<SourceCollection> {
        self.require_copied()?;
        let output = &self.ctx.config().output;
        let mut hashed = SourceCollection::new();

        for source in sources.iter() {
            let bytes = match source.content() {
                Some(content) => content.as_bytes().to_vec(),
                None => tokio::fs::read(source.path())
                    .await
                    .map_err(|e| Error::io(source.path(), e))?,
            };
            let alias = graft_util::hash::fingerprint_path(&source.logical_path(), &bytes);
            let out_path = output.join(&alias);
            graft_util::fs::atomic_write(&out_path, &bytes).map_err(|e| Error::io(&out_path, e))?;

            let mut renamed = source.clone();
            renamed.set_alias(alias);
            hashed.add(renamed);
        }

        tracing::debug!(count = hashed.len(), "Hashed sources");
        Ok(hashed)
    }

    /// Build each entrypoint's graph, one entrypoint at a time.
    ///
    /// # Errors
    /// The first failing graph aborts the step.
    pub async fn build_module_graphs(
        &mut self,
        sources: &SourceCollection,
        mut entrypoints: Vec<Entrypoint>,
    ) -> Result<Vec<Entrypoint>> {
        self.require_copied()?;
        for entrypoint in &mut entrypoints {
            build_module_graph(&self.ctx, sources, entrypoint).await?;
        }
        self.advance(BuildState::GraphsBuilt);
        Ok(entrypoints)
    }

    /// Classify, compile, hash and graph copied sources.
    ///
    /// # Errors
    /// Fails with [`Error::SourcesNotCopied`] before `copy_sources`, and
    /// otherwise with the first error of any step.
    pub async fn build(&mut self, sources: &SourceCollection) -> Result<BuildResult> {
        self.require_copied()?;

        let classification = self.classify(sources).await?;
        let compiled = self.compile_sources(&classification.compilable).await?;
        let mut merged = sources.merge(&compiled);

        let hashable: SourceCollection = classification
            .hashable
            .paths()
            .filter_map(|path| merged.get(path).cloned())
            .collect();
        let hashed = self.hash_sources(&hashable).await?;
        merged = merged.merge(&hashed);

        let entrypoints = classification
            .entrypoints
            .into_iter()
            .map(|mut entry| {
                if let Some(current) = merged.get(entry.source.path()) {
                    entry.source = current.clone();
                }
                entry
            })
            .collect();
        let entrypoints = self.build_module_graphs(&merged, entrypoints).await?;

        let manifest = Manifest::new(
            self.ctx.config().name.clone(),
            &merged,
            &entrypoints,
            self.ctx.classifier(),
        );
        self.advance(BuildState::Done);

        Ok(BuildResult {
            sources: merged,
            compiled,
            entrypoints,
            manifest,
        })
    }
}

/// `lib/app.tsx` + `js` -> `lib/app.js`.
fn replace_extension(path: &str, extension: &str) -> String {
    let (dir, name) = path.rsplit_once('/').map_or(("", path), |(d, n)| (d, n));
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let file = format!("{stem}.{extension}");
    if dir.is_empty() {
        file
    } else {
        format!("{dir}/{file}")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiler::{CompileOutput, Compiler, CompilerError};
    use crate::config::{BuildConfig, EntrypointConfig, Target};
    use crate::fetch::FetchError;
    use crate::graph::LoadResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use url::Url;

    /// Passes content through unchanged and counts calls.
    #[derive(Default)]
    pub(crate) struct CountingCompiler {
        pub(crate) calls: AtomicUsize,
    }

    impl CountingCompiler {
        pub(crate) fn arc() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    impl Compiler for CountingCompiler {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn compile(
            &self,
            content: &str,
            options: &CompileOptions,
        ) -> std::result::Result<CompileOutput, CompilerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = CompileOutput::new(content);
            Ok(if options.source_maps {
                output.with_map(r#"{"version":3,"mappings":""}"#)
            } else {
                output
            })
        }
    }

    /// Never finds anything remote.
    pub(crate) struct NoFetch;

    impl Fetch for NoFetch {
        async fn fetch(
            &self,
            _url: &Url,
        ) -> std::result::Result<Option<LoadResponse>, FetchError> {
            Ok(None)
        }
    }

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    fn builder(dir: &TempDir, compiler: Arc<CountingCompiler>) -> Builder<NoFetch> {
        let config = BuildConfig::new(dir.path(), dir.path().join("dist"))
            .with_entrypoint("a.ts", EntrypointConfig::new("browser", Target::Browser))
            .with_hashable(vec!["static/**".to_string()])
            .with_cache(false);
        Builder::new(BuildContext::with_fetcher(config, compiler, None).unwrap())
    }

    #[test]
    fn test_replace_extension() {
        assert_eq!(replace_extension("app.tsx", "js"), "app.js");
        assert_eq!(replace_extension("lib/util.ts", "js"), "lib/util.js");
        assert_eq!(replace_extension("Makefile", "js"), "Makefile.js");
    }

    #[tokio::test]
    async fn test_build_before_copy_fails_without_compiling() {
        let dir = project(&[("a.ts", "export const a = 1;")]);
        let compiler = CountingCompiler::arc();
        let mut builder = builder(&dir, compiler.clone());

        let sources = builder.gather_sources().await.unwrap();
        assert_eq!(builder.state(), BuildState::SourcesGathered);

        let err = builder.build(&sources).await.unwrap_err();
        assert!(matches!(err, Error::SourcesNotCopied));
        assert_eq!(err.to_string(), "must copy sources before building");
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(builder.state(), BuildState::SourcesGathered);
    }

    #[tokio::test]
    async fn test_steps_before_copy_fail() {
        let dir = project(&[("a.ts", "export const a = 1;")]);
        let mut builder = builder(&dir, CountingCompiler::arc());
        let sources = builder.gather_sources().await.unwrap();
        let a = sources.iter().next().unwrap().clone();

        assert!(matches!(
            builder.compile_source(&a).await,
            Err(Error::SourcesNotCopied)
        ));
        assert!(matches!(
            builder.classify(&sources).await,
            Err(Error::SourcesNotCopied)
        ));
        assert!(matches!(
            builder.build_module_graphs(&sources, Vec::new()).await,
            Err(Error::SourcesNotCopied)
        ));
    }

    #[tokio::test]
    async fn test_compile_source_rejects_non_compilable() {
        let dir = project(&[("style.css", "body {}")]);
        let compiler = CountingCompiler::arc();
        let mut builder = builder(&dir, compiler.clone());
        let sources = builder.gather_sources().await.unwrap();
        let copied = builder
            .copy_sources(&sources, &dir.path().join("dist"))
            .await
            .unwrap();

        let css = copied.iter().next().unwrap();
        let err = builder.compile_source(css).await.unwrap_err();
        assert!(matches!(err, Error::NotCompilable { .. }));
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_copy_skips_excluded_and_output() {
        let dir = project(&[
            ("a.ts", ""),
            ("node_modules/x/index.js", ""),
            ("dist/old.js", ""),
        ]);
        let mut builder = builder(&dir, CountingCompiler::arc());
        let sources = builder.gather_sources().await.unwrap();
        assert_eq!(sources.len(), 3);

        let dest = dir.path().join("dist");
        let copied = builder.copy_sources(&sources, &dest).await.unwrap();
        assert_eq!(copied.len(), 1);
        assert!(dest.join("a.ts").exists());
        assert!(copied.iter().all(|s| s.root() == dest));
        assert_eq!(builder.state(), BuildState::Copied);
    }

    #[tokio::test]
    async fn test_clean_output_tolerates_missing_dir() {
        let dir = project(&[]);
        let builder = builder(&dir, CountingCompiler::arc());
        builder.clean_output().await;
        assert!(!dir.path().join("dist").exists());
    }

    #[tokio::test]
    async fn test_full_build() {
        let dir = project(&[
            ("a.ts", "import { b } from \"./b.ts\";\nconsole.log(b);\n"),
            ("b.ts", "export const b = 1;\n"),
            ("static/logo.png", "png-bytes"),
            ("index.html", "<html></html>"),
        ]);
        let compiler = CountingCompiler::arc();
        let mut builder = builder(&dir, compiler.clone());
        let dest = dir.path().join("dist");

        let sources = builder.gather_sources().await.unwrap();
        builder.clean_output().await;
        let copied = builder.copy_sources(&sources, &dest).await.unwrap();
        let result = builder.build(&copied).await.unwrap();

        assert_eq!(builder.state(), BuildState::Done);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.compiled.len(), 2);
        assert!(dest.join("a.js").exists());
        assert!(dest.join("b.js").exists());

        let entry = result.entrypoint("a.ts").unwrap();
        assert_eq!(entry.logical_path(), "a.js");
        let graph = entry.graph().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert!(entry.bare_specifiers.is_empty());

        let logo = result.manifest.files["static/logo.png"].clone();
        assert!(logo.starts_with("static/logo."));
        assert!(logo.ends_with(".png"));
        assert!(dest.join(&logo).exists());
        assert_eq!(result.manifest.files["a.ts"], "a.js");
        assert_eq!(result.manifest.files["index.html"], "index.html");
    }

    #[tokio::test]
    async fn test_source_maps_written() {
        let dir = project(&[("a.ts", "export const a = 1;\n")]);
        let mut config = BuildConfig::new(dir.path(), dir.path().join("dist")).with_cache(false);
        config.compiler.source_maps = true;
        let mut builder = Builder::new(
            BuildContext::<NoFetch>::with_fetcher(config, CountingCompiler::arc(), None).unwrap(),
        );

        let sources = builder.gather_sources().await.unwrap();
        let copied = builder
            .copy_sources(&sources, &dir.path().join("dist"))
            .await
            .unwrap();
        let a = copied.iter().next().unwrap();
        let compiled = builder.compile_source(a).await.unwrap();

        assert_eq!(compiled.relative_alias(), Some("a.js"));
        assert!(dir.path().join("dist").join("a.js.map").exists());
        assert!(compiled
            .content()
            .unwrap()
            .contains("//# sourceMappingURL=a.js.map"));
    }
}
