//! Build configuration.
//!
//! A project is described by a `graft.json` document next to (or above) its
//! sources. Paths inside the document may be relative to the document's
//! directory; [`BuildConfig::load`] makes them absolute.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "graft.json";

/// Default JavaScript language level requested from CDN hosts and compilers.
pub const DEFAULT_ES_TARGET: &str = "es2020";

/// Configuration errors. These are fatal and raised before any build step.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} must be an absolute path, got {path}")]
    RelativePath { field: &'static str, path: PathBuf },

    #[error("Failed to read import map at {path}: {source}")]
    ImportMapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse import map at {path}: {message}")]
    ImportMapParse { path: PathBuf, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Cannot express {path} as a file URL")]
    InvalidBaseUrl { path: PathBuf },
}

/// Output target of an entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Browser,
    Deno,
}

impl Target {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Deno => "deno",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level requested by the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Registry entry for one entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointConfig {
    /// Output subdirectory, relative to the build output.
    pub output: String,
    /// Runtime the entrypoint is built for.
    #[serde(default)]
    pub target: Target,
}

impl EntrypointConfig {
    #[must_use]
    pub fn new(output: impl Into<String>, target: Target) -> Self {
        Self {
            output: output.into(),
            target,
        }
    }
}

/// Compiler flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub source_maps: bool,
    #[serde(default = "default_es_target")]
    pub target: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            minify: false,
            source_maps: false,
            target: default_es_target(),
        }
    }
}

fn default_es_target() -> String {
    DEFAULT_ES_TARGET.to_string()
}

fn default_exclude() -> Vec<String> {
    vec![".git/**".to_string(), "node_modules/**".to_string()]
}

fn default_compilable() -> Vec<String> {
    vec!["**/*.{ts,tsx,jsx}".to_string()]
}

fn default_cdn_hosts() -> Vec<String> {
    vec!["esm.sh".to_string()]
}

fn default_true() -> bool {
    true
}

/// Build configuration consumed by the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Project root (absolute).
    pub root: PathBuf,

    /// Output directory (absolute).
    pub output: PathBuf,

    /// Import map document, relative to `root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map: Option<PathBuf>,

    /// Entrypoint registry keyed by root-relative path.
    #[serde(default)]
    pub entrypoints: BTreeMap<String, EntrypointConfig>,

    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub hashable: Vec<String>,

    #[serde(default = "default_compilable")]
    pub compilable: Vec<String>,

    /// Sources left out of the manifest.
    #[serde(default)]
    pub manifest_exclude: Vec<String>,

    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Hosts whose module URLs get normalized query parameters.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Use the on-disk module cache for remote modules.
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl BuildConfig {
    /// Create a config with defaults for everything but the two paths.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: output.into(),
            import_map: None,
            entrypoints: BTreeMap::new(),
            exclude: default_exclude(),
            hashable: Vec::new(),
            compilable: default_compilable(),
            manifest_exclude: Vec::new(),
            compiler: CompilerConfig::default(),
            cdn_hosts: default_cdn_hosts(),
            name: None,
            log_level: None,
            cache: true,
        }
    }

    /// Load a config file, resolving relative `root`/`output` against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or(Path::new("."));
        if config.root.is_relative() {
            config.root = base.join(&config.root);
        }
        if config.output.is_relative() {
            config.output = base.join(&config.output);
        }

        Ok(config)
    }

    /// Check the invariants the builder relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.is_absolute() {
            return Err(ConfigError::RelativePath {
                field: "root",
                path: self.root.clone(),
            });
        }
        if !self.output.is_absolute() {
            return Err(ConfigError::RelativePath {
                field: "output",
                path: self.output.clone(),
            });
        }
        Ok(())
    }

    /// Absolute path of the import map document, if one is configured.
    #[must_use]
    pub fn import_map_path(&self) -> Option<PathBuf> {
        self.import_map.as_ref().map(|p| self.root.join(p))
    }

    #[must_use]
    pub fn with_import_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.import_map = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_entrypoint(mut self, path: impl Into<String>, entry: EntrypointConfig) -> Self {
        self.entrypoints.insert(path.into(), entry);
        self
    }

    #[must_use]
    pub fn with_hashable(mut self, patterns: Vec<String>) -> Self {
        self.hashable = patterns;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}
