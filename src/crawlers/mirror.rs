use crate::browser::Renderer;
use crate::config::MirrorConfig;
use crate::discovery::discover;
use crate::downloader::{DownloadJob, DownloadReport, Downloader, spawn_downloads};
use crate::error::MirrorError;
use crate::filter::UrlFilter;
use crate::frontier::{Frontier, FrontierEntry};
use crate::mapper::{PathRegistry, map_path};
use crate::parsers;
use crate::results::{DownloadOutcome, Failure, Page, Resource, Summary};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Where the controller is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    SessionOpen,
    PageInFlight,
    ResourcesPending,
    Done,
    Closed,
}

/// Owns the frontier and the resource set for one mirror run.
///
/// Only this type mutates either. Download workers get owned jobs and send
/// their outcomes back over a channel.
pub struct MirrorCrawler {
    seed: Url,
    filter: UrlFilter,
    frontier: Frontier,
    resources: HashMap<String, Resource>,
    resource_order: Vec<String>,
    paths: PathRegistry,
    summary: Summary,
    state: CrawlState,
    render_timeout: Duration,
    page_delay: Duration,
    download_concurrency: usize,
    include_external_assets: bool,
}

impl MirrorCrawler {
    pub fn new(config: &MirrorConfig) -> Result<Self, MirrorError> {
        let seed = UrlFilter::normalize_url(&Url::parse(&config.start_url)?);
        let filter = UrlFilter::new(&seed, &config.links)?;

        Ok(Self {
            filter,
            frontier: Frontier::new(config.max_pages.max(1), config.max_depth),
            resources: HashMap::new(),
            resource_order: Vec::new(),
            paths: PathRegistry::new(),
            summary: Summary::default(),
            state: CrawlState::Idle,
            render_timeout: config.render_timeout(),
            page_delay: config.page_delay(),
            download_concurrency: config.download_concurrency,
            include_external_assets: config.include_external_assets,
            seed,
        })
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    fn transition(&mut self, next: CrawlState) {
        ::log::trace!("Crawl state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Mirrors the site using an already opened `renderer`.
    ///
    /// The renderer is closed before this returns, whatever the outcome. A
    /// failure to render the seed page is returned as an error; every other
    /// failure is recorded in the summary.
    pub async fn run<R: Renderer>(
        mut self,
        mut renderer: R,
        downloader: Downloader,
    ) -> Result<Summary, MirrorError> {
        self.transition(CrawlState::SessionOpen);

        let crawled = self.crawl_pages(&mut renderer, &downloader).await;
        if crawled.is_ok() {
            self.transition(CrawlState::Done);
        }
        self.close_session(renderer).await;
        crawled?;

        self.download_resources(downloader).await;

        ::log::info!(
            "Mirror complete - {} pages, {} resources, {} failures, {} paths written",
            self.summary.pages_saved,
            self.summary.resources_downloaded(),
            self.summary.failure_count(),
            self.paths.len()
        );
        Ok(self.summary)
    }

    /// Ends the browser session; resources are fetched without it
    async fn close_session<R: Renderer>(&mut self, renderer: R) {
        if let Err(e) = renderer.close().await {
            ::log::warn!("Failed to close browser session: {}", e);
        }
        self.transition(CrawlState::Closed);
    }

    async fn crawl_pages<R: Renderer>(
        &mut self,
        renderer: &mut R,
        downloader: &Downloader,
    ) -> Result<(), MirrorError> {
        self.frontier.push(self.seed.clone(), 0);
        let mut is_seed = true;

        while let Some(entry) = self.frontier.pop() {
            if !is_seed && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            self.transition(CrawlState::PageInFlight);
            ::log::info!(
                "[{}/{}] Visiting: {}",
                self.frontier.admitted() - self.frontier.pending(),
                self.frontier.admitted(),
                entry.url
            );

            match self.visit(renderer, downloader, &entry).await {
                Ok(page) => {
                    self.transition(CrawlState::ResourcesPending);
                    self.merge(page, entry.depth);
                }
                Err(e) if is_seed => {
                    ::log::error!("Failed to render seed page {}: {}", entry.url, e);
                    return Err(e);
                }
                Err(e) => {
                    ::log::error!("Failed to render {}: {}", entry.url, e);
                    self.summary.pages_failed.push(Failure {
                        url: entry.url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            is_seed = false;
        }

        Ok(())
    }

    /// Renders one page, saves its HTML and extracts what it references
    async fn visit<R: Renderer>(
        &mut self,
        renderer: &mut R,
        downloader: &Downloader,
        entry: &FrontierEntry,
    ) -> Result<Page, MirrorError> {
        let url = &entry.url;
        let html = renderer.render(url, self.render_timeout).await?;

        let local_path = map_path(url);
        if let Some(collision) = self.paths.claim(&local_path, url) {
            self.summary.record_collision(collision);
        }
        match downloader.write(html.as_bytes(), &local_path).await {
            Ok(path) => {
                self.summary.pages_saved += 1;
                ::log::info!("Saved: {} -> {}", url, path.display());
            }
            Err(e) => {
                ::log::error!("Failed to save {}: {}", url, e);
                self.summary.pages_failed.push(Failure {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let raw = match renderer.query_resources().await {
            Ok(raw) => raw,
            Err(e) => {
                ::log::warn!("Falling back to static HTML for {}: {}", url, e);
                parsers::html::parse(&html)
            }
        };

        let found = discover(&raw, url, &self.filter);
        ::log::info!(
            "Found {} stylesheets, {} scripts, {} images, {} links on {}",
            found.stylesheets.len(),
            found.scripts.len(),
            found.images.len(),
            found.links.len(),
            url
        );

        let resources = found
            .resources()
            .map(|(kind, url)| (kind, url.clone()))
            .collect();
        Ok(Page::new(url.clone(), html, resources, found.links))
    }

    /// Folds a page's findings into the resource set and the frontier
    fn merge(&mut self, page: Page, depth: usize) {
        for (kind, url) in page.resources {
            let url = UrlFilter::normalize_url(&url);
            if !self.include_external_assets && !self.filter.is_same_origin(&url) {
                ::log::debug!("Skipping external resource {}", url);
                continue;
            }

            let key = url.as_str().to_string();
            if self.resources.contains_key(&key) {
                continue;
            }

            let local_path = map_path(&url);
            if let Some(collision) = self.paths.claim(&local_path, &url) {
                self.summary.record_collision(collision);
            }
            self.resources
                .insert(key.clone(), Resource::new(key.clone(), kind, local_path));
            self.resource_order.push(key);
        }

        for link in page.links {
            if self.frontier.is_full() {
                ::log::trace!("Page limit reached, ignoring remaining links");
                break;
            }
            if self.frontier.contains(&link) {
                ::log::trace!("Skipping already visited or queued link: {}", link);
                continue;
            }
            if self.frontier.push(link.clone(), depth + 1) {
                ::log::debug!("Queuing link for crawling: {}", link);
            }
        }
    }

    /// Groups pending resources by local path, keeping discovery order inside each group
    fn download_jobs(&self) -> Vec<DownloadJob> {
        let mut jobs: Vec<DownloadJob> = Vec::new();
        let mut by_path: HashMap<PathBuf, usize> = HashMap::new();

        for key in &self.resource_order {
            let Some(resource) = self.resources.get(key) else {
                continue;
            };
            if resource.outcome != DownloadOutcome::Pending {
                continue;
            }
            let Ok(url) = Url::parse(&resource.url) else {
                continue;
            };

            match by_path.get(&resource.local_path) {
                Some(&index) => jobs[index].urls.push(url),
                None => {
                    by_path.insert(resource.local_path.clone(), jobs.len());
                    jobs.push(DownloadJob {
                        local_path: resource.local_path.clone(),
                        urls: vec![url],
                    });
                }
            }
        }

        jobs
    }

    async fn download_resources(&mut self, downloader: Downloader) {
        let jobs = self.download_jobs();
        if jobs.is_empty() {
            return;
        }

        ::log::info!(
            "Downloading {} resources into {}",
            self.resource_order.len(),
            downloader.root().display()
        );
        let mut reports = spawn_downloads(Arc::new(downloader), jobs, self.download_concurrency);
        while let Some(report) = reports.recv().await {
            self.record_download(report);
        }
    }

    fn record_download(&mut self, report: DownloadReport) {
        let Some(resource) = self.resources.get_mut(report.url.as_str()) else {
            ::log::warn!("Report for unknown resource {}", report.url);
            return;
        };

        match report.result {
            Ok(_) => {
                resource.outcome = DownloadOutcome::Success;
                *self.summary.downloaded.entry(resource.kind).or_insert(0) += 1;
            }
            Err(e) => {
                let reason = e.to_string();
                resource.outcome = DownloadOutcome::Failed(reason.clone());
                self.summary.resources_failed.push(Failure {
                    url: resource.url.clone(),
                    reason,
                });
            }
        }
    }

    /// Resources known so far, in discovery order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resource_order
            .iter()
            .filter_map(|key| self.resources.get(key))
    }
}
