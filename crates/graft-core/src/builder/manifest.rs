use super::Entrypoint;
use crate::classify::Classifier;
use crate::config::Target;
use crate::sources::SourceCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Per-entrypoint manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntrypoint {
    pub output: String,
    pub target: Target,
    pub modules: usize,
    /// Bare specifier to final module URL.
    pub imports: BTreeMap<String, String>,
}

/// Where each source ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Root-relative source path to output path.
    pub files: BTreeMap<String, String>,
    pub entrypoints: BTreeMap<String, ManifestEntrypoint>,
}

impl Manifest {
    /// Describe a finished build.
    #[must_use]
    pub fn new(
        name: Option<String>,
        sources: &SourceCollection,
        entrypoints: &[Entrypoint],
        classifier: &Classifier,
    ) -> Self {
        let files = sources
            .iter()
            .filter(|source| !classifier.is_manifest_excluded(source))
            .map(|source| (source.relative_path(), source.logical_path()))
            .collect();

        let entrypoints = entrypoints
            .iter()
            .map(|entry| {
                (
                    entry.logical_path(),
                    ManifestEntrypoint {
                        output: entry.output.clone(),
                        target: entry.target,
                        modules: entry.graph().map_or(0, |g| g.len()),
                        imports: entry.resolved_bare_specifiers(),
                    },
                )
            })
            .collect();

        Self {
            name,
            files,
            entrypoints,
        }
    }

    /// Write `manifest.json` into `dir`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write(&self, dir: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        graft_util::fs::atomic_write(&dir.join(MANIFEST_FILE_NAME), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, EntrypointConfig};
    use crate::sources::SourceFile;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_lists_logical_paths_and_skips_excluded() {
        let mut config = BuildConfig::new("/out", "/out/dist");
        config.manifest_exclude = vec!["**/*.map".to_string()];
        let classifier = Classifier::from_config(&config).unwrap();

        let sources: SourceCollection = [
            SourceFile::new("/out/app.tsx", "/out").with_alias("app.js"),
            SourceFile::new("/out/index.html", "/out"),
            SourceFile::new("/out/app.js.map", "/out"),
        ]
        .into_iter()
        .collect();
        let entry = Entrypoint::new(
            SourceFile::new("/out/app.tsx", "/out").with_alias("app.js"),
            &EntrypointConfig::new("browser", Target::Browser),
        );

        let manifest = Manifest::new(Some("demo".to_string()), &sources, &[entry], &classifier);
        assert_eq!(manifest.files["app.tsx"], "app.js");
        assert_eq!(manifest.files["index.html"], "index.html");
        assert!(!manifest.files.contains_key("app.js.map"));
        assert_eq!(manifest.entrypoints["app.js"].output, "browser");
        assert_eq!(manifest.entrypoints["app.js"].modules, 0);
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::default();
        manifest.write(&dir.path().join("nested")).unwrap();
        let written = std::fs::read_to_string(dir.path().join("nested").join(MANIFEST_FILE_NAME))
            .unwrap();
        let parsed: Manifest = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, manifest);
    }
}
