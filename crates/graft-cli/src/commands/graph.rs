//! `graft graph` command implementation.

use super::{context, fail, print_json, runtime};
use crate::observe::ObservedBuilder;
use graft_core::{Builder, Entrypoint, Error};
use miette::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Graph command action.
#[derive(Debug, Clone)]
pub struct GraphAction {
    pub config: PathBuf,
    /// Root-relative entrypoint path, before or after compilation.
    pub entry: String,
}

#[derive(Serialize)]
struct GraphResultJson<'a> {
    ok: bool,
    entrypoint: String,
    graph: &'a graft_core::ModuleGraph,
    imports: BTreeMap<String, String>,
}

/// Run the graph command.
pub fn run(action: GraphAction, json: bool) -> Result<()> {
    let runtime = runtime()?;
    match runtime.block_on(graph(&action)) {
        Ok(entry) => report(&entry, json),
        Err(e) => fail(&e, json),
    }
}

async fn graph(action: &GraphAction) -> Result<Entrypoint, Error> {
    let ctx = context(&action.config)?;
    let output = ctx.config().output.clone();
    let mut builder = ObservedBuilder::new(Builder::new(ctx));

    let sources = builder.gather_sources().await?;
    let copied = builder.copy_sources(&sources, &output).await?;
    let classification = builder.classify(&copied).await?;
    let compiled = builder.compile_sources(&classification.compilable).await?;
    let merged = copied.merge(&compiled);

    let mut entry = classification
        .entrypoints
        .into_iter()
        .find(|e| e.source.relative_path() == action.entry || e.logical_path() == action.entry)
        .ok_or_else(|| Error::UnknownEntrypoint(action.entry.clone()))?;
    if let Some(current) = merged.get(entry.source.path()) {
        entry.source = current.clone();
    }

    let mut built = builder.build_module_graphs(&merged, vec![entry]).await?;
    built
        .pop()
        .ok_or_else(|| Error::UnknownEntrypoint(action.entry.clone()))
}

fn report(entry: &Entrypoint, json: bool) -> Result<()> {
    let Some(graph) = entry.graph() else {
        return Ok(());
    };

    if json {
        return print_json(&GraphResultJson {
            ok: true,
            entrypoint: entry.logical_path(),
            graph,
            imports: entry.resolved_bare_specifiers(),
        });
    }

    println!("{} ({} modules)", entry.logical_path(), graph.len());
    for (from, to) in graph.edges() {
        println!("  {from} -> {to}");
    }
    Ok(())
}
