//! Project source files.
//!
//! A [`SourceFile`] is one file under a project root; a [`SourceCollection`]
//! is the deduplicated set the builder works on.

mod collection;
mod file;

pub use collection::SourceCollection;
pub use file::{file_url, SourceFile};

use std::io;
use std::path::Path;

/// Walk `root` and collect every regular file below it.
///
/// # Errors
/// Returns an error if the tree cannot be read.
pub fn gather_sources(root: &Path) -> io::Result<SourceCollection> {
    let files = graft_util::fs::walk_files(root)?;
    Ok(files
        .into_iter()
        .map(|path| SourceFile::new(path, root))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_gather_sources_relative_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("app.ts"), "").unwrap();
        std::fs::write(dir.path().join("lib").join("util.ts"), "").unwrap();

        let sources = gather_sources(dir.path()).unwrap();
        let mut relative: Vec<String> = sources.iter().map(SourceFile::relative_path).collect();
        relative.sort();
        assert_eq!(relative, vec!["app.ts", "lib/util.ts"]);
    }
}
