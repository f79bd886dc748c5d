use clap::Parser;
use page_mirror::MirrorConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-mirror")]
#[command(about = "Mirror a live website into a local static file tree using a real browser")]
#[command(version)]
pub struct Args {
    /// Seed URL to mirror (its origin bounds the crawl)
    pub url: String,

    /// JSON configuration file; flags given on the command line take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory to write the mirror into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of pages to render, seed included
    #[arg(short, long)]
    pub max_pages: Option<usize>,

    /// Maximum number of links to follow away from the seed
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Number of concurrent resource downloads
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// WebDriver endpoint (the WEBDRIVER_URL environment variable also works)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Per-page render timeout in milliseconds
    #[arg(long)]
    pub render_timeout: Option<u64>,

    /// Pause after a page settles, in milliseconds
    #[arg(long)]
    pub settle_delay: Option<u64>,

    /// Pause between page visits, in milliseconds
    #[arg(long)]
    pub page_delay: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

impl Args {
    /// Builds the run configuration: file (if any), then environment, then flags
    pub fn into_config(self) -> Result<MirrorConfig, page_mirror::MirrorError> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = MirrorConfig::from_file(path)?;
                config.start_url = self.url.clone();
                config
            }
            None => MirrorConfig::new(&self.url),
        };
        config.apply_env();

        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        if let Some(concurrency) = self.concurrency {
            config.download_concurrency = concurrency;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if let Some(ms) = self.render_timeout {
            config.render_timeout_ms = ms;
        }
        if let Some(ms) = self.settle_delay {
            config.settle_delay_ms = ms;
        }
        if let Some(ms) = self.page_delay {
            config.page_delay_ms = ms;
        }
        if self.headed {
            config.headless = false;
        }
        if self.summary_json.is_some() {
            config.summary_path = self.summary_json;
        }

        Ok(config)
    }
}
