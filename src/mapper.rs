use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for the site root and for directory-style paths
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Maps an absolute URL to a path relative to the mirror root.
///
/// * `/` becomes [`DEFAULT_DOCUMENT`]
/// * `/docs/` becomes `docs/index.html`
/// * `/about` (no extension) becomes `about.html`
/// * `/css/site.css` is kept as `css/site.css`
///
/// Query strings and fragments are ignored, so URLs that differ only in those
/// parts share a path and the last write wins.
pub fn map_path(url: &Url) -> PathBuf {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();

    let directory_style = segments.last().is_none_or(|last| last.is_empty());
    let parts: Vec<&str> = segments
        .into_iter()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect();

    let mut path = PathBuf::new();
    for part in &parts {
        path.push(part);
    }

    if parts.is_empty() {
        return PathBuf::from(DEFAULT_DOCUMENT);
    }

    if directory_style {
        path.push(DEFAULT_DOCUMENT);
        return path;
    }

    if path.extension().is_none() {
        let mut file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".html");
        path.set_file_name(file_name);
    }

    path
}

/// Two distinct URLs that resolved to the same local path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCollision {
    pub path: PathBuf,
    pub previous: String,
    pub current: String,
}

/// Remembers which URL last claimed each local path
#[derive(Debug, Default)]
pub struct PathRegistry {
    owners: HashMap<PathBuf, String>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as the owner of `path`, returning a collision if another URL held it
    pub fn claim(&mut self, path: &Path, url: &Url) -> Option<PathCollision> {
        let current = url.as_str().to_string();
        match self.owners.insert(path.to_path_buf(), current.clone()) {
            Some(previous) if previous != current => {
                ::log::warn!(
                    "{} and {} both map to {}, keeping the later one",
                    previous,
                    current,
                    path.display()
                );
                Some(PathCollision {
                    path: path.to_path_buf(),
                    previous,
                    current,
                })
            }
            _ => None,
        }
    }

    /// Number of distinct local paths claimed
    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
