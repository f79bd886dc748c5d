//! Mirrors a live website into a local static file tree.
//!
//! Pages are rendered in a real browser (so script-generated content is
//! captured), every stylesheet, script and image they reference is
//! downloaded at its original path, and same-origin links are followed up to
//! a page limit.

// Re-export modules
pub mod browser;
pub mod config;
pub mod crawlers;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod frontier;
pub mod mapper;
pub mod parsers;
pub mod results;

// Re-export commonly used types for convenience
pub use config::MirrorConfig;
pub use error::{DownloadError, MirrorError};
pub use mapper::map_path;
pub use results::Summary;

use browser::BrowserSession;
use crawlers::MirrorCrawler;
use downloader::Downloader;
use fingerprint::FingerprintProfile;
use std::path::Path;

/// Main builder for a mirror run
pub struct Mirror {
    config: MirrorConfig,
    profile: FingerprintProfile,
}

impl Mirror {
    /// Create a new Mirror builder for the given seed URL
    pub fn new(start_url: &str) -> Self {
        Self::with_config(MirrorConfig::new(start_url))
    }

    /// Create a builder from a complete configuration
    pub fn with_config(config: MirrorConfig) -> Self {
        let profile = FingerprintProfile::default().with_headless(config.headless);
        Self { config, profile }
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, MirrorError> {
        Ok(Self::with_config(MirrorConfig::from_file(path)?))
    }

    /// Set the directory the mirror tree is written under
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of pages to render
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum number of concurrent downloads
    pub fn with_download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.download_concurrency = concurrency;
        self
    }

    /// Replace the browser identity presented to the site
    pub fn with_profile(mut self, profile: FingerprintProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Opens a browser session and mirrors the site.
    ///
    /// Fails if the browser cannot be started or the seed page cannot be
    /// rendered; anything else is reported in the returned [`Summary`].
    pub async fn run(self) -> Result<Summary, MirrorError> {
        ::log::info!("Starting mirror of {}", self.config.start_url);

        // Validate everything before launching the browser
        let crawler = MirrorCrawler::new(&self.config)?;
        let downloader = Downloader::new(
            &self.profile,
            &self.config.output_dir,
            self.config.download_timeout(),
        )?
        .with_retries(self.config.download_retries, downloader::RETRY_BACKOFF);

        let session = BrowserSession::open(
            &self.profile,
            &self.config.webdriver_url,
            self.config.settle_delay(),
        )
        .await?;

        let summary = crawler.run(session, downloader).await?;

        if let Some(path) = &self.config.summary_path {
            let json = serde_json::to_string_pretty(&summary)?;
            if let Err(e) = std::fs::write(path, json) {
                ::log::error!("Failed to write summary to {}: {}", path.display(), e);
            }
        }

        Ok(summary)
    }
}
