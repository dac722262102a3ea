use super::FetchError;
use crate::graph::LoadResponse;
use crate::paths::module_cache_dir;
use crate::version::CACHE_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sidecar written next to each cached body.
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    schema: u32,
    /// Specifier the entry was stored under.
    requested: String,
    /// Where the content actually came from.
    specifier: String,
}

/// On-disk cache of remote module bodies, keyed by blake3 of the specifier.
#[derive(Debug, Clone)]
pub struct ModuleCache {
    dir: PathBuf,
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new(module_cache_dir())
    }
}

impl ModuleCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_paths(&self, specifier: &str) -> (PathBuf, PathBuf) {
        let key = graft_util::hash::blake3_bytes(specifier.as_bytes());
        let prefix = &key[..2];
        let base = self.dir.join(prefix);
        (
            base.join(format!("{key}.js")),
            base.join(format!("{key}.json")),
        )
    }

    /// Cached response for `specifier`, if any.
    ///
    /// Unreadable or stale entries are treated as misses.
    pub async fn get(&self, specifier: &str) -> Option<LoadResponse> {
        let (body_path, header_path) = self.entry_paths(specifier);

        let header = tokio::fs::read_to_string(&header_path).await.ok()?;
        let header: EntryHeader = match serde_json::from_str(&header) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(path = %header_path.display(), error = %e, "Ignoring corrupt cache entry");
                return None;
            }
        };
        if header.schema != CACHE_SCHEMA_VERSION || header.requested != specifier {
            return None;
        }

        let content = tokio::fs::read_to_string(&body_path).await.ok()?;
        tracing::trace!(specifier, "Module cache hit");
        Some(LoadResponse::new(header.specifier, content))
    }

    /// Store `response` as the result of loading `specifier`.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written.
    pub fn put(&self, specifier: &str, response: &LoadResponse) -> Result<(), FetchError> {
        let (body_path, header_path) = self.entry_paths(specifier);
        let header = EntryHeader {
            schema: CACHE_SCHEMA_VERSION,
            requested: specifier.to_string(),
            specifier: response.specifier.clone(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| FetchError::Cache {
            path: header_path.clone(),
            source: std::io::Error::other(e),
        })?;

        // Body first so a header never points at a missing body
        graft_util::fs::atomic_write(&body_path, response.content.as_bytes()).map_err(
            |source| FetchError::Cache {
                path: body_path.clone(),
                source,
            },
        )?;
        graft_util::fs::atomic_write(&header_path, &header).map_err(|source| {
            FetchError::Cache {
                path: header_path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());
        assert!(cache.get("https://esm.sh/react").await.is_none());

        let response = LoadResponse::new("https://esm.sh/react@18.2.0", "export default 1;");
        cache.put("https://esm.sh/react", &response).unwrap();

        let hit = cache.get("https://esm.sh/react").await.unwrap();
        assert_eq!(hit, response);
        assert!(cache.get("https://esm.sh/vue").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_header_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());
        let response = LoadResponse::new("https://x/a.js", "a");
        cache.put("https://x/a.js", &response).unwrap();

        let (_, header_path) = cache.entry_paths("https://x/a.js");
        std::fs::write(&header_path, "not json").unwrap();
        assert!(cache.get("https://x/a.js").await.is_none());
    }
}
