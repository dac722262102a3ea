use super::{baseline_resolve, Baseline, BareSpecifierMap, CacheEntry, ResolveError, ResolverCache};
use crate::import_map::{ImportMap, ImportMapResolution};
use crate::sources::{SourceCollection, SourceFile};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Counters for observing resolver work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: usize,
    pub import_map_lookups: usize,
    pub local_lookups: usize,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicUsize,
    import_map_lookups: AtomicUsize,
    local_lookups: AtomicUsize,
}

/// Resolves specifiers for one entrypoint's graph build.
///
/// Precedence, per call:
/// 1. the `(specifier, referrer)` cache
/// 2. the baseline URL resolution
/// 3. the import map, which overrides the baseline when it matches
/// 4. local sources, for baseline results with a `file:` URL
///
/// The cache is shared across entrypoints of a build; the bare specifier
/// map belongs to the current entrypoint.
#[derive(Debug)]
pub struct SpecifierResolver<'a> {
    import_map: &'a ImportMap,
    sources: &'a SourceCollection,
    cache: &'a ResolverCache,
    bare: &'a BareSpecifierMap,
    counters: Counters,
}

impl<'a> SpecifierResolver<'a> {
    #[must_use]
    pub fn new(
        import_map: &'a ImportMap,
        sources: &'a SourceCollection,
        cache: &'a ResolverCache,
        bare: &'a BareSpecifierMap,
    ) -> Self {
        Self {
            import_map,
            sources,
            cache,
            bare,
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn bare_specifiers(&self) -> &BareSpecifierMap {
        self.bare
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            import_map_lookups: self.counters.import_map_lookups.load(Ordering::Relaxed),
            local_lookups: self.counters.local_lookups.load(Ordering::Relaxed),
        }
    }

    /// Resolve `specifier` imported from `referrer` to a URL string.
    ///
    /// # Errors
    /// Returns a [`ResolveError`] naming both inputs when no rule applies.
    pub fn resolve(&self, specifier: &str, referrer: &str) -> Result<String, ResolveError> {
        if let Some(entry) = self.cache.get(specifier, referrer) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            if entry.via_import_map {
                // A warm cache from an earlier entrypoint must still populate this map
                self.bare.record(specifier, &entry.resolved);
            }
            tracing::trace!(specifier, referrer, resolved = %entry.resolved, "Resolve cache hit");
            return Ok(entry.resolved);
        }

        tracing::debug!(specifier, referrer, "Resolve");

        let referrer_url = Url::parse(referrer).map_err(|_| ResolveError::InvalidUrl {
            specifier: specifier.to_string(),
            referrer: referrer.to_string(),
        })?;
        let baseline = baseline_resolve(specifier, &referrer_url)?;

        self.counters
            .import_map_lookups
            .fetch_add(1, Ordering::Relaxed);
        let entry = match self.import_map.resolve(specifier, &referrer_url) {
            ImportMapResolution::Matched(url) => {
                let resolved = self.canonical_target(url);
                self.bare.record(specifier, &resolved);
                CacheEntry {
                    resolved,
                    via_import_map: true,
                }
            }
            ImportMapResolution::Blocked => {
                return Err(ResolveError::Blocked {
                    specifier: specifier.to_string(),
                    referrer: referrer.to_string(),
                });
            }
            ImportMapResolution::NoMatch => CacheEntry {
                resolved: self.resolve_baseline(specifier, referrer, baseline)?,
                via_import_map: false,
            },
        };

        tracing::debug!(specifier, referrer, resolved = %entry.resolved, "Resolved");
        self.cache.insert(specifier, referrer, entry.clone());
        Ok(entry.resolved)
    }

    fn resolve_baseline(
        &self,
        specifier: &str,
        referrer: &str,
        baseline: Baseline,
    ) -> Result<String, ResolveError> {
        match baseline {
            Baseline::Bare(_) => Err(ResolveError::UnmappedBare {
                specifier: specifier.to_string(),
                referrer: referrer.to_string(),
            }),
            Baseline::Url(url) if url.scheme() == "file" => self.resolve_local(specifier, referrer, &url),
            Baseline::Url(url) => Ok(url.into()),
        }
    }

    /// Import map targets naming a local source resolve to its logical URL.
    fn canonical_target(&self, url: Url) -> String {
        if url.scheme() != "file" {
            return url.into();
        }
        match self.sources.find_by_url(&url).and_then(SourceFile::logical_url) {
            Some(logical) => logical.to_string(),
            None => url.into(),
        }
    }

    /// Canonicalize a `file:` URL against the gathered sources.
    fn resolve_local(&self, specifier: &str, referrer: &str, url: &Url) -> Result<String, ResolveError> {
        self.counters.local_lookups.fetch_add(1, Ordering::Relaxed);
        self.sources
            .find_by_url(url)
            .and_then(SourceFile::logical_url)
            .map(String::from)
            .ok_or_else(|| ResolveError::LocalNotFound {
                specifier: specifier.to_string(),
                referrer: referrer.to_string(),
            })
    }
}
