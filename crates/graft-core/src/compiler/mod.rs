//! Compiler abstraction.
//!
//! The builder never calls a compiler library directly; it is handed an
//! implementation of [`Compiler`] once, at startup.

#[cfg(feature = "swc")]
mod swc;

#[cfg(feature = "swc")]
pub use swc::SwcCompiler;

use std::fmt;
use std::path::PathBuf;

/// Compiler error codes.
pub mod codes {
    pub const COMPILER_PARSE_ERROR: &str = "COMPILER_PARSE_ERROR";
    pub const COMPILER_TRANSFORM_ERROR: &str = "COMPILER_TRANSFORM_ERROR";
}

/// Options for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Source path; its extension selects TypeScript/JSX syntax.
    pub path: PathBuf,
    pub minify: bool,
    pub source_maps: bool,
    /// Language level, e.g. `es2020`.
    pub target: String,
}

/// Compiled JavaScript plus an optional source map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOutput {
    pub code: String,
    pub map: Option<String>,
}

impl CompileOutput {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    #[must_use]
    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }
}

/// A source-to-JavaScript compiler.
pub trait Compiler: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Compile `content`.
    ///
    /// # Errors
    /// Returns an error if the source cannot be parsed or emitted.
    fn compile(&self, content: &str, options: &CompileOptions) -> Result<CompileOutput, CompilerError>;
}

/// Error during compilation.
#[derive(Debug)]
pub struct CompilerError {
    pub code: &'static str,
    pub message: String,
}

impl CompilerError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_PARSE_ERROR, message)
    }

    #[must_use]
    pub fn transform_error(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_TRANSFORM_ERROR, message)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CompilerError {}
