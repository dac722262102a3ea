//! Structured before/after logging around builder steps.
//!
//! [`ObservedBuilder`] owns a [`Builder`] and forwards each step through
//! [`step`], which logs the start, the elapsed time and any error.

use graft_core::builder::Classification;
use graft_core::fetch::Fetch;
use graft_core::{BuildResult, Builder, Entrypoint, SourceCollection};
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

/// Run `fut` as the named step, logging around it.
pub async fn step<T, E, Fut>(name: &'static str, fut: Fut) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    tracing::debug!(step = name, "Step started");
    let start = Instant::now();
    let result = fut.await;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(_) => tracing::info!(step = name, elapsed_ms, "Step finished"),
        Err(e) => tracing::error!(step = name, elapsed_ms, error = %e, "Step failed"),
    }
    result
}

/// A [`Builder`] whose steps are logged.
pub struct ObservedBuilder<F> {
    inner: Builder<F>,
}

impl<F: Fetch> ObservedBuilder<F> {
    pub fn new(inner: Builder<F>) -> Self {
        Self { inner }
    }

    pub async fn gather_sources(&mut self) -> graft_core::Result<SourceCollection> {
        step("gather_sources", self.inner.gather_sources()).await
    }

    pub async fn clean_output(&self) {
        let unit = async {
            self.inner.clean_output().await;
            Ok::<_, std::convert::Infallible>(())
        };
        let _ = step("clean_output", unit).await;
    }

    pub async fn copy_sources(
        &mut self,
        sources: &SourceCollection,
        dest: &Path,
    ) -> graft_core::Result<SourceCollection> {
        step("copy_sources", self.inner.copy_sources(sources, dest)).await
    }

    pub async fn classify(
        &mut self,
        sources: &SourceCollection,
    ) -> graft_core::Result<Classification> {
        step("classify", self.inner.classify(sources)).await
    }

    pub async fn compile_sources(
        &mut self,
        sources: &SourceCollection,
    ) -> graft_core::Result<SourceCollection> {
        step("compile_sources", self.inner.compile_sources(sources)).await
    }

    pub async fn build_module_graphs(
        &mut self,
        sources: &SourceCollection,
        entrypoints: Vec<Entrypoint>,
    ) -> graft_core::Result<Vec<Entrypoint>> {
        step(
            "build_module_graphs",
            self.inner.build_module_graphs(sources, entrypoints),
        )
        .await
    }

    pub async fn build(&mut self, sources: &SourceCollection) -> graft_core::Result<BuildResult> {
        step("build", self.inner.build(sources)).await
    }
}
