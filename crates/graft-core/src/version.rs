/// Crate version, embedded at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk layout version of the module cache.
///
/// Bump when the cache entry format changes so stale entries are ignored.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// User agent sent with remote module requests.
#[must_use]
pub fn user_agent() -> String {
    format!("graft/{VERSION}")
}
