use std::io;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// File URL for an absolute path, if the path can be expressed as one.
#[must_use]
pub fn file_url(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// A file under a project root.
///
/// The path is the identity of a source; the content may be replaced in
/// memory once the file has been compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    root: PathBuf,
    alias: Option<String>,
    content: Option<String>,
}

impl SourceFile {
    /// Create a source. Relative paths are taken relative to `root`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = path.into();
        let path = if path.is_relative() {
            root.join(path)
        } else {
            path
        };
        Self {
            path,
            root,
            alias: None,
            content: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.set_alias(alias);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root-relative, slash-separated path.
    #[must_use]
    pub fn relative_path(&self) -> String {
        let relative = self.path.strip_prefix(&self.root).unwrap_or(&self.path);
        to_slash(relative)
    }

    #[must_use]
    pub fn relative_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The path other modules import this file by: the alias if set, else the relative path.
    #[must_use]
    pub fn logical_path(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.relative_path())
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        self.alias = Some(alias.trim_start_matches("./").replace('\\', "/"));
    }

    #[must_use]
    pub fn url(&self) -> Option<Url> {
        file_url(&self.path)
    }

    #[must_use]
    pub fn alias_url(&self) -> Option<Url> {
        self.alias
            .as_ref()
            .and_then(|alias| file_url(&self.root.join(alias)))
    }

    /// The URL other modules import this file by: the alias URL if set, else the file URL.
    #[must_use]
    pub fn logical_url(&self) -> Option<Url> {
        self.alias_url().or_else(|| self.url())
    }

    /// Whether `url` names this file, physically or through its alias.
    #[must_use]
    pub fn matches_url(&self, url: &Url) -> bool {
        self.url().as_ref() == Some(url) || self.alias_url().as_ref() == Some(url)
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    /// Read the source text: compiled content if present, else the file on disk.
    pub async fn read(&self) -> io::Result<String> {
        if let Some(content) = &self.content {
            return Ok(content.clone());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The same logical file placed under another root.
    #[must_use]
    pub fn rebase(&self, root: &Path) -> Self {
        let relative = self.path.strip_prefix(&self.root).unwrap_or(&self.path);
        Self {
            path: root.join(relative),
            root: root.to_path_buf(),
            alias: self.alias.clone(),
            content: self.content.clone(),
        }
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
