//! `graft resolve` command implementation.

use super::{context, fail, print_json};
use graft_core::graph::{GraphResolver, Resolve};
use graft_core::{gather_sources, BareSpecifierMap, Error, SpecifierResolver};
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Resolve command action.
#[derive(Debug, Clone)]
pub struct ResolveAction {
    pub config: PathBuf,
    pub specifier: String,
    pub referrer: String,
}

#[derive(Serialize)]
struct ResolveResultJson {
    ok: bool,
    specifier: String,
    referrer: String,
    resolved: String,
    /// Set when the specifier was bare and mapped through the import map.
    #[serde(skip_serializing_if = "Option::is_none")]
    bare: Option<String>,
}

/// Run the resolve command.
///
/// Resolution runs against the unbuilt sources under the project root.
/// CDN URLs are normalized the same way graph edges are.
pub fn run(action: ResolveAction, json: bool) -> Result<()> {
    match resolve(&action) {
        Ok(result) => {
            if json {
                print_json(&result)
            } else {
                println!("{}", result.resolved);
                Ok(())
            }
        }
        Err(e) => fail(&e, json),
    }
}

fn resolve(action: &ResolveAction) -> Result<ResolveResultJson, Error> {
    let ctx = context(&action.config)?;
    let root = &ctx.config().root;
    let sources = gather_sources(root).map_err(|e| Error::io(root, e))?;

    let bare = BareSpecifierMap::new();
    let resolver = GraphResolver::new(
        SpecifierResolver::new(ctx.import_map(), &sources, ctx.resolver_cache(), &bare),
        ctx.remote(),
    );
    let resolved = resolver.resolve(&action.specifier, &action.referrer)?;

    Ok(ResolveResultJson {
        ok: true,
        specifier: action.specifier.clone(),
        referrer: action.referrer.clone(),
        bare: bare.get(&action.specifier),
        resolved,
    })
}
