//! Module graphs.
//!
//! [`engine`] walks modules from a root; [`loader`] and [`builder`] supply
//! the load and resolve callbacks for one entrypoint.

pub mod builder;
pub mod engine;
pub mod lexer;
pub mod loader;
mod model;
pub mod remote;

pub use builder::{build_module_graph, GraphResolver};
pub use engine::{create_graph, Load, LoadResponse, Resolve};
pub use lexer::{scan_module, ImportKind, ImportRecord, ModuleInfo};
pub use loader::ModuleLoader;
pub use model::{Dependency, Module, ModuleGraph};
pub use remote::{prepare_remote_url, RemoteOptions};

use crate::fetch::FetchError;
use crate::resolver::ResolveError;
use thiserror::Error;

/// Errors that abort a graph build.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Module not found: {specifier}")]
    ModuleNotFound { specifier: String },

    #[error("Failed to read {specifier}: {source}")]
    Io {
        specifier: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
