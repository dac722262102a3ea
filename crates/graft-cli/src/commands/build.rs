//! `graft build` command implementation.

use super::{context, fail, print_json, runtime};
use crate::observe::ObservedBuilder;
use graft_core::builder::MANIFEST_FILE_NAME;
use graft_core::{BuildResult, Builder, Error, Target};
use miette::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Build command action.
#[derive(Debug, Clone)]
pub struct BuildAction {
    pub config: PathBuf,
    /// Keep the output directory instead of removing it first.
    pub no_clean: bool,
}

#[derive(Serialize)]
struct BuildResultJson {
    ok: bool,
    output: String,
    manifest: String,
    counts: BuildCountsJson,
    entrypoints: Vec<EntrypointJson>,
}

#[derive(Serialize)]
struct BuildCountsJson {
    sources: usize,
    compiled: usize,
    entrypoints: usize,
}

#[derive(Serialize)]
struct EntrypointJson {
    path: String,
    output: String,
    target: Target,
    modules: usize,
    imports: BTreeMap<String, String>,
}

/// Run the build command.
pub fn run(action: BuildAction, json: bool) -> Result<()> {
    let runtime = runtime()?;
    let outcome = runtime.block_on(build(&action));

    match outcome {
        Ok((output, result)) => report(&output, &result, json),
        Err(e) => fail(&e, json),
    }
}

async fn build(action: &BuildAction) -> Result<(PathBuf, BuildResult), Error> {
    let ctx = context(&action.config)?;
    let output = ctx.config().output.clone();
    let mut builder = ObservedBuilder::new(Builder::new(ctx));

    let sources = builder.gather_sources().await?;
    if !action.no_clean {
        builder.clean_output().await;
    }
    let copied = builder.copy_sources(&sources, &output).await?;
    let result = builder.build(&copied).await?;

    result
        .manifest
        .write(&output)
        .map_err(|e| Error::io(output.join(MANIFEST_FILE_NAME), e))?;

    Ok((output, result))
}

fn report(output: &std::path::Path, result: &BuildResult, json: bool) -> Result<()> {
    let entrypoints: Vec<EntrypointJson> = result
        .entrypoints
        .iter()
        .map(|entry| EntrypointJson {
            path: entry.logical_path(),
            output: entry.output.clone(),
            target: entry.target,
            modules: entry.graph().map_or(0, |g| g.len()),
            imports: entry.resolved_bare_specifiers(),
        })
        .collect();

    if json {
        return print_json(&BuildResultJson {
            ok: true,
            output: output.display().to_string(),
            manifest: output.join(MANIFEST_FILE_NAME).display().to_string(),
            counts: BuildCountsJson {
                sources: result.sources.len(),
                compiled: result.compiled.len(),
                entrypoints: entrypoints.len(),
            },
            entrypoints,
        });
    }

    println!(
        "Built {} sources ({} compiled) into {}",
        result.sources.len(),
        result.compiled.len(),
        output.display()
    );
    for entry in &entrypoints {
        println!(
            "  {} [{}] -> {}/ ({} modules)",
            entry.path, entry.target, entry.output, entry.modules
        );
        for (specifier, url) in &entry.imports {
            println!("    {specifier} -> {url}");
        }
    }
    Ok(())
}
