use crate::compiler::CompilerError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::graph::GraphError;
use crate::resolver::ResolveError;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, surfaced in JSON output.
pub mod codes {
    pub const GRAFT_CONFIG_INVALID: &str = "GRAFT_CONFIG_INVALID";
    pub const GRAFT_SOURCES_NOT_COPIED: &str = "GRAFT_SOURCES_NOT_COPIED";
    pub const GRAFT_RESOLVE_FAILED: &str = "GRAFT_RESOLVE_FAILED";
    pub const GRAFT_NOT_COMPILABLE: &str = "GRAFT_NOT_COMPILABLE";
    pub const GRAFT_COMPILE_FAILED: &str = "GRAFT_COMPILE_FAILED";
    pub const GRAFT_GRAPH_FAILED: &str = "GRAFT_GRAPH_FAILED";
    pub const GRAFT_UNKNOWN_ENTRYPOINT: &str = "GRAFT_UNKNOWN_ENTRYPOINT";
    pub const GRAFT_FETCH_FAILED: &str = "GRAFT_FETCH_FAILED";
    pub const GRAFT_IO: &str = "GRAFT_IO";
}

/// Result alias for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type for graft operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("must copy sources before building")]
    SourcesNotCopied,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("source is not compilable: {path}")]
    NotCompilable { path: PathBuf },

    #[error("failed to compile {path}: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: CompilerError,
    },

    #[error("failed to build module graph for {entrypoint}: {source}")]
    Graph {
        entrypoint: String,
        #[source]
        source: GraphError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no entrypoint configured for {0}")]
    UnknownEntrypoint(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an IO error with the path it happened at.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable, machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => codes::GRAFT_CONFIG_INVALID,
            Self::SourcesNotCopied => codes::GRAFT_SOURCES_NOT_COPIED,
            Self::Resolve(_) => codes::GRAFT_RESOLVE_FAILED,
            Self::NotCompilable { .. } => codes::GRAFT_NOT_COMPILABLE,
            Self::Compile { .. } => codes::GRAFT_COMPILE_FAILED,
            Self::Graph { .. } => codes::GRAFT_GRAPH_FAILED,
            Self::Fetch(_) => codes::GRAFT_FETCH_FAILED,
            Self::UnknownEntrypoint(_) => codes::GRAFT_UNKNOWN_ENTRYPOINT,
            Self::Io { .. } => codes::GRAFT_IO,
        }
    }
}
