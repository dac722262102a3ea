//! Import specifier resolution.
//!
//! Resolves import specifiers to absolute URL strings.
//!
//! ## Specifier Types
//!
//! - Relative: `./utils.ts`, `../lib/foo.ts`
//! - Absolute path: `/lib/foo.ts`
//! - Remote: `https://esm.sh/react@18`
//! - Bare: `react`, `@scope/pkg`, `preact/hooks`

mod cache;
mod specifier;

pub use cache::{BareSpecifierMap, CacheEntry, ResolverCache};
pub use specifier::{ResolverStats, SpecifierResolver};

use thiserror::Error;
use url::Url;

/// A specifier that no rule could resolve.
///
/// Every variant names the specifier and the referrer it was imported from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cannot resolve '{specifier}' from '{referrer}': not a valid URL")]
    InvalidUrl { specifier: String, referrer: String },

    #[error("Cannot resolve '{specifier}' from '{referrer}': bare specifier is not in the import map")]
    UnmappedBare { specifier: String, referrer: String },

    #[error("Cannot resolve '{specifier}' from '{referrer}': blocked by the import map")]
    Blocked { specifier: String, referrer: String },

    #[error("Cannot resolve '{specifier}' from '{referrer}': could not resolve local source")]
    LocalNotFound { specifier: String, referrer: String },
}

impl ResolveError {
    #[must_use]
    pub fn specifier(&self) -> &str {
        match self {
            Self::InvalidUrl { specifier, .. }
            | Self::UnmappedBare { specifier, .. }
            | Self::Blocked { specifier, .. }
            | Self::LocalNotFound { specifier, .. } => specifier,
        }
    }

    #[must_use]
    pub fn referrer(&self) -> &str {
        match self {
            Self::InvalidUrl { referrer, .. }
            | Self::UnmappedBare { referrer, .. }
            | Self::Blocked { referrer, .. }
            | Self::LocalNotFound { referrer, .. } => referrer,
        }
    }

    fn invalid_url(specifier: &str, referrer: &str) -> Self {
        Self::InvalidUrl {
            specifier: specifier.to_string(),
            referrer: referrer.to_string(),
        }
    }
}

/// `./x`, `../x` or `/x`.
#[must_use]
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// An `http:` or `https:` URL.
#[must_use]
pub fn is_remote_specifier(specifier: &str) -> bool {
    Url::parse(specifier).is_ok_and(|url| is_remote_url(&url))
}

/// Neither path-like nor a URL, e.g. `react`.
#[must_use]
pub fn is_bare_specifier(specifier: &str) -> bool {
    !is_local_specifier(specifier) && Url::parse(specifier).is_err()
}

pub(crate) fn is_remote_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolution before the import map is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    Url(Url),
    Bare(String),
}

/// Resolve `specifier` against `referrer` with plain URL semantics.
///
/// Absolute paths imported from a remote module resolve against that
/// module's origin. Bare specifiers are returned untouched.
///
/// # Errors
/// Returns [`ResolveError::InvalidUrl`] if no well-formed URL can be built.
pub fn baseline_resolve(specifier: &str, referrer: &Url) -> Result<Baseline, ResolveError> {
    if is_bare_specifier(specifier) {
        return Ok(Baseline::Bare(specifier.to_string()));
    }

    let invalid = || ResolveError::invalid_url(specifier, referrer.as_str());

    if specifier.starts_with('/') && !specifier.starts_with("//") && is_remote_url(referrer) {
        let origin = Url::parse(&referrer.origin().ascii_serialization()).map_err(|_| invalid())?;
        return origin.join(specifier).map(Baseline::Url).map_err(|_| invalid());
    }

    referrer
        .join(specifier)
        .map(Baseline::Url)
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifier_kinds() {
        assert!(is_bare_specifier("react"));
        assert!(is_bare_specifier("@scope/pkg"));
        assert!(is_bare_specifier("preact/hooks"));
        assert!(!is_bare_specifier("./a.ts"));
        assert!(!is_bare_specifier("/a.ts"));
        assert!(!is_bare_specifier("https://esm.sh/react"));

        assert!(is_remote_specifier("https://esm.sh/react"));
        assert!(!is_remote_specifier("file:///a.ts"));
        assert!(is_local_specifier("../a.ts"));
    }

    #[test]
    fn test_baseline_relative() {
        let referrer = Url::parse("file:///project/lib/a.ts").unwrap();
        let resolved = baseline_resolve("../b.ts", &referrer).unwrap();
        assert_eq!(
            resolved,
            Baseline::Url(Url::parse("file:///project/b.ts").unwrap())
        );
    }

    #[test]
    fn test_baseline_absolute_path_from_remote_uses_origin() {
        let referrer = Url::parse("https://esm.sh/v135/react@18/es2020/react.mjs").unwrap();
        let resolved = baseline_resolve("/stable/react.mjs", &referrer).unwrap();
        assert_eq!(
            resolved,
            Baseline::Url(Url::parse("https://esm.sh/stable/react.mjs").unwrap())
        );
    }

    #[test]
    fn test_baseline_remote_passes_through() {
        let referrer = Url::parse("file:///project/a.ts").unwrap();
        let resolved = baseline_resolve("https://esm.sh/react", &referrer).unwrap();
        assert_eq!(
            resolved,
            Baseline::Url(Url::parse("https://esm.sh/react").unwrap())
        );
    }

    #[test]
    fn test_baseline_bare() {
        let referrer = Url::parse("file:///project/a.ts").unwrap();
        assert_eq!(
            baseline_resolve("react", &referrer).unwrap(),
            Baseline::Bare("react".to_string())
        );
    }

    #[test]
    fn test_error_names_specifier_and_referrer() {
        let err = ResolveError::LocalNotFound {
            specifier: "./missing.ts".to_string(),
            referrer: "file:///project/a.ts".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("./missing.ts"));
        assert!(message.contains("file:///project/a.ts"));
        assert_eq!(err.specifier(), "./missing.ts");
    }
}
