//! Source classification.
//!
//! Every predicate is evaluated against glob patterns compiled once per
//! build context. Patterns use `**` as globstar and support `{a,b}` brace
//! alternation, which is expanded before compilation.

use crate::config::{BuildConfig, ConfigError};
use crate::sources::SourceFile;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled list of glob patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a list of patterns.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that does not compile.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref();
            for expanded in expand_braces(raw) {
                let pattern = Pattern::new(expanded.trim_start_matches("./")).map_err(|e| {
                    ConfigError::InvalidPattern {
                        pattern: raw.to_string(),
                        message: e.msg.to_string(),
                    }
                })?;
                compiled.push(pattern);
            }
        }
        Ok(Self { patterns: compiled })
    }

    /// Whether any pattern matches the slash-separated relative path.
    #[must_use]
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Expand `{a,b}` alternations into every concrete pattern.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let at = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(at);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(at),
            _ => {}
        }
    }

    // Unbalanced or no alternatives: treat braces literally
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };
    if splits.is_empty() {
        return vec![pattern.to_string()];
    }

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut out = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &pattern[pair[0] + 1..pair[1]];
        for tail in expand_braces(&format!("{alternative}{suffix}")) {
            out.push(format!("{prefix}{tail}"));
        }
    }
    out
}

/// Membership predicates over a fixed set of patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Registry key and its compiled pattern.
    entrypoints: Vec<(String, PatternSet)>,
    excluded: PatternSet,
    hashable: PatternSet,
    compilable: PatternSet,
    manifest_excluded: PatternSet,
    output: PathBuf,
}

impl Classifier {
    /// Compile the classifier from configuration.
    ///
    /// # Errors
    /// Returns an error if any configured pattern is invalid.
    pub fn from_config(config: &BuildConfig) -> Result<Self, ConfigError> {
        let entrypoints = config
            .entrypoints
            .keys()
            .map(|key| Ok((key.clone(), PatternSet::new(&[key])?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            entrypoints,
            excluded: PatternSet::new(&config.exclude)?,
            hashable: PatternSet::new(&config.hashable)?,
            compilable: PatternSet::new(&config.compilable)?,
            manifest_excluded: PatternSet::new(&config.manifest_exclude)?,
            output: config.output.clone(),
        })
    }

    /// Matched by logical name: the alias when present, else the relative path.
    #[must_use]
    pub fn is_entrypoint(&self, source: &SourceFile) -> bool {
        self.matching_entrypoint(source).is_some()
    }

    /// Registry key of the first entrypoint pattern matching `source`.
    #[must_use]
    pub fn matching_entrypoint(&self, source: &SourceFile) -> Option<&str> {
        let logical = source.logical_path();
        self.entrypoints
            .iter()
            .find(|(_, pattern)| pattern.matches(&logical))
            .map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn is_compilable(&self, source: &SourceFile) -> bool {
        self.compilable.matches(&source.relative_path())
    }

    #[must_use]
    pub fn is_hashable(&self, source: &SourceFile) -> bool {
        self.hashable.matches(&source.relative_path())
    }

    /// Sources inside the output directory are always excluded.
    #[must_use]
    pub fn is_excluded(&self, source: &SourceFile) -> bool {
        self.is_in_output(source.path()) || self.excluded.matches(&source.relative_path())
    }

    #[must_use]
    pub fn is_manifest_excluded(&self, source: &SourceFile) -> bool {
        self.manifest_excluded.matches(&source.logical_path())
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    fn is_in_output(&self, path: &Path) -> bool {
        path.starts_with(&self.output)
    }
}
