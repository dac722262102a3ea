use crate::version::CACHE_SCHEMA_VERSION;
use std::path::PathBuf;

/// Environment variable overriding the cache directory (used by tests and CI).
pub const CACHE_DIR_ENV: &str = "GRAFT_CACHE_DIR";

/// Get the cache directory for graft.
///
/// Uses platform-appropriate locations with versioning:
/// - Linux: `$XDG_CACHE_HOME/graft/v{N}` or `~/.cache/graft/v{N}`
/// - macOS: `~/Library/Caches/graft/v{N}`
/// - Windows: `%LOCALAPPDATA%\graft\v{N}`
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }

    let base = dirs_next::cache_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".graft-cache"),
                |p| p.join(".cache").join("graft"),
            )
        },
        |p| p.join("graft"),
    );

    base.join(format!("v{CACHE_SCHEMA_VERSION}"))
}

/// Directory holding cached remote modules.
#[must_use]
pub fn module_cache_dir() -> PathBuf {
    cache_dir().join("modules")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_cache_dir_is_under_cache_dir() {
        assert!(module_cache_dir().starts_with(cache_dir()));
        assert!(module_cache_dir().ends_with("modules"));
    }
}
