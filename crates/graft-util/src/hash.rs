//! Content hashing for cache keys and fingerprinted file names.

/// Hex characters of the digest kept in fingerprinted names.
pub const SHORT_HASH_LEN: usize = 8;

/// Hex-encoded BLAKE3 digest of `data`.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// First [`SHORT_HASH_LEN`] hex characters of the BLAKE3 digest of `data`.
#[must_use]
pub fn short_hash(data: &[u8]) -> String {
    let mut hex = blake3_bytes(data);
    hex.truncate(SHORT_HASH_LEN);
    hex
}

/// Insert the short hash of `data` before the extension of a slash path.
///
/// `static/logo.png` becomes `static/logo.<hash>.png`. Names without an
/// extension (or dotfiles) get the hash appended.
#[must_use]
pub fn fingerprint_path(path: &str, data: &[u8]) -> String {
    let hash = short_hash(data);
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let file = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{hash}.{ext}"),
        _ => format!("{name}.{hash}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes_known_digest() {
        assert_eq!(
            blake3_bytes(b"hello world"),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_short_hash_is_prefix() {
        assert_eq!(short_hash(b"hello world"), "d74981ef");
    }

    #[test]
    fn test_fingerprint_path() {
        assert_eq!(
            fingerprint_path("static/logo.png", b"hello world"),
            "static/logo.d74981ef.png"
        );
        assert_eq!(fingerprint_path("a.tar.gz", b"hello world"), "a.tar.d74981ef.gz");
        assert_eq!(fingerprint_path("LICENSE", b"hello world"), "LICENSE.d74981ef");
        assert_eq!(fingerprint_path("cfg/.env", b"hello world"), "cfg/.env.d74981ef");
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(
            fingerprint_path("app.css", b"a {}"),
            fingerprint_path("app.css", b"b {}")
        );
    }
}
