#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Specifier resolution and module-graph construction for ES-module projects.
//!
//! The pipeline gathers sources under a project root, classifies them,
//! compiles the compilable ones and builds one module graph per configured
//! entrypoint. Every import specifier met on the way is resolved through the
//! project's import map, the local source set or remote URL rules.

pub mod builder;
pub mod classify;
pub mod compiler;
pub mod config;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod import_map;
pub mod paths;
pub mod resolver;
pub mod sources;
pub mod version;

pub use builder::{BuildContext, BuildResult, BuildState, Builder, Entrypoint};
pub use classify::Classifier;
pub use config::{BuildConfig, EntrypointConfig, Target};
pub use error::{Error, Result};
pub use graph::{build_module_graph, ModuleGraph};
pub use import_map::{ImportMap, ImportMapResolution};
pub use resolver::{BareSpecifierMap, ResolveError, ResolverCache, SpecifierResolver};
pub use sources::{gather_sources, SourceCollection, SourceFile};
pub use version::VERSION;
