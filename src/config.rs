use crate::error::MirrorError;
use crate::filter::UrlFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a mirror run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// URL to start mirroring from
    pub start_url: String,

    /// Directory the mirror tree is written under
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of pages to render, seed included
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of links to follow away from the seed (unbounded if unset)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Maximum number of concurrent resource downloads
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Deadline for a page to load and go idle
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Pause after a page goes idle before its HTML is read
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Pause between page visits
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-request deadline for resource downloads
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Extra attempts for a resource after a transient failure
    #[serde(default = "default_download_retries")]
    pub download_retries: usize,

    /// Also download resources hosted on other origins (CDNs)
    #[serde(default = "default_include_external_assets")]
    pub include_external_assets: bool,

    /// Which links are followed
    #[serde(default)]
    pub links: UrlFilterConfig,

    /// Where to write a JSON copy of the run summary
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_max_pages() -> usize {
    10
}

fn default_download_concurrency() -> usize {
    6
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_render_timeout_ms() -> u64 {
    60_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_download_timeout_secs() -> u64 {
    30
}

fn default_download_retries() -> usize {
    2
}

fn default_include_external_assets() -> bool {
    true
}

impl MirrorConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            output_dir: default_output_dir(),
            max_pages: default_max_pages(),
            max_depth: None,
            download_concurrency: default_download_concurrency(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            render_timeout_ms: default_render_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            download_timeout_secs: default_download_timeout_secs(),
            download_retries: default_download_retries(),
            include_external_assets: default_include_external_assets(),
            links: UrlFilterConfig::default(),
            summary_path: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MirrorError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, MirrorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
