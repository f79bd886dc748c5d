use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::mapper::PathCollision;

/// Kind of asset a page referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Script,
    Stylesheet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Image => "images",
            ResourceKind::Script => "scripts",
            ResourceKind::Stylesheet => "stylesheets",
        };
        f.write_str(name)
    }
}

/// A rendered page and what was found on it
#[derive(Debug, Clone)]
pub struct Page {
    /// URL of the page
    pub url: Url,

    /// Rendered HTML as the browser saw it after scripts ran
    pub html: String,

    /// Absolute resource URLs referenced by the page
    pub resources: Vec<(ResourceKind, Url)>,

    /// Same-origin links, normalized
    pub links: Vec<Url>,
}

impl Page {
    pub fn new(
        url: Url,
        html: String,
        resources: Vec<(ResourceKind, Url)>,
        links: Vec<Url>,
    ) -> Self {
        Self {
            url,
            html,
            resources,
            links,
        }
    }
}

/// Where a resource is in its download lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum DownloadOutcome {
    Pending,
    Success,
    Failed(String),
}

/// A non-HTML asset discovered during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub kind: ResourceKind,
    /// Path relative to the output directory
    pub local_path: PathBuf,
    pub outcome: DownloadOutcome,
}

impl Resource {
    pub fn new(url: String, kind: ResourceKind, local_path: PathBuf) -> Self {
        Self {
            url,
            kind,
            local_path,
            outcome: DownloadOutcome::Pending,
        }
    }
}

/// A URL that could not be mirrored and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub url: String,
    pub reason: String,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub pages_saved: usize,
    pub pages_failed: Vec<Failure>,
    pub downloaded: BTreeMap<ResourceKind, usize>,
    pub resources_failed: Vec<Failure>,
    pub collisions: Vec<PathCollision>,
}

impl Summary {
    /// Total resources written successfully
    pub fn resources_downloaded(&self) -> usize {
        self.downloaded.values().sum()
    }

    /// Page and resource failures combined
    pub fn failure_count(&self) -> usize {
        self.pages_failed.len() + self.resources_failed.len()
    }

    pub(crate) fn record_collision(&mut self, collision: PathCollision) {
        self.collisions.push(collision);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages saved:          {}", self.pages_saved)?;
        writeln!(f, "Pages failed:         {}", self.pages_failed.len())?;
        writeln!(f, "Resources downloaded: {}", self.resources_downloaded())?;
        for kind in [
            ResourceKind::Stylesheet,
            ResourceKind::Script,
            ResourceKind::Image,
        ] {
            let count = self.downloaded.get(&kind).copied().unwrap_or(0);
            writeln!(f, "  {:<12} {}", kind, count)?;
        }
        writeln!(f, "Resources failed:     {}", self.resources_failed.len())?;
        if !self.collisions.is_empty() {
            writeln!(f, "Path collisions:      {}", self.collisions.len())?;
        }

        for failure in self.pages_failed.iter().chain(&self.resources_failed) {
            writeln!(f, "  x {}: {}", failure.url, failure.reason)?;
        }
        Ok(())
    }
}
