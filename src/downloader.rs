//! Fetches resources over plain HTTP and writes them into the mirror tree.

use crate::error::{DownloadError, MirrorError};
use crate::fingerprint::FingerprintProfile;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use url::Url;

/// Base delay between attempts; the nth retry waits n times this
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Every URL that should end up at one local path, in discovery order.
/// Processing them in order makes the last-discovered URL win.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub local_path: PathBuf,
    pub urls: Vec<Url>,
}

/// Result of one URL sent back to the controller
#[derive(Debug)]
pub struct DownloadReport {
    pub url: Url,
    pub result: Result<PathBuf, DownloadError>,
}

/// HTTP client that writes what it fetches under a root directory
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    root: PathBuf,
    retries: usize,
    retry_backoff: Duration,
}

impl Downloader {
    /// Builds a client that identifies with the profile's user agent
    pub fn new(
        profile: &FingerprintProfile,
        root: impl Into<PathBuf>,
        request_timeout: Duration,
    ) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&profile.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        // Accept-Encoding is left to the client so responses are decoded
        let client = Client::builder()
            .user_agent(profile.user_agent.clone())
            .default_headers(headers)
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            root: root.into(),
            retries: 2,
            retry_backoff: RETRY_BACKOFF,
        })
    }

    /// Set how many extra attempts a transient failure gets and the base delay between them
    pub fn with_retries(mut self, retries: usize, backoff: Duration) -> Self {
        self.retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetches the body of `url`, retrying transient failures
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    let wait = self.retry_backoff * attempt as u32;
                    ::log::warn!(
                        "{}; retrying in {:.1}s ({}/{})",
                        e,
                        wait.as_secs_f64(),
                        attempt,
                        self.retries
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let http_error = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_error)?;
        Ok(body.to_vec())
    }

    /// Writes `bytes` to `relative` under the root, creating parent
    /// directories and replacing any existing file
    pub async fn write(&self, bytes: &[u8], relative: &Path) -> Result<PathBuf, DownloadError> {
        let path = self.root.join(relative);
        let io_error = |source| DownloadError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;
        Ok(path)
    }

    /// Fetches and writes one URL
    pub async fn download(&self, url: &Url, relative: &Path) -> Result<PathBuf, DownloadError> {
        let bytes = self.fetch(url).await?;
        let path = self.write(&bytes, relative).await?;
        ::log::info!("Downloaded: {} -> {}", url, path.display());
        Ok(path)
    }
}

/// Runs `jobs` on at most `max_concurrency` tasks and returns a receiver
/// yielding one report per URL. The channel closes when every job is done.
pub fn spawn_downloads(
    downloader: Arc<Downloader>,
    jobs: Vec<DownloadJob>,
    max_concurrency: usize,
) -> mpsc::Receiver<DownloadReport> {
    let total: usize = jobs.iter().map(|job| job.urls.len()).sum();
    let (report_tx, report_rx) = mpsc::channel(total.max(1));
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    ::log::debug!(
        "Dispatching {} downloads across {} paths with {} workers",
        total,
        jobs.len(),
        max_concurrency
    );

    tokio::spawn(async move {
        for (worker_id, job) in jobs.into_iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let downloader = Arc::clone(&downloader);
            let report_tx = report_tx.clone();

            tokio::spawn(async move {
                for url in job.urls {
                    let result = downloader.download(&url, &job.local_path).await;
                    if let Err(e) = &result {
                        ::log::error!("Failed to download {}: {}", url, e);
                    }
                    if report_tx.send(DownloadReport { url, result }).await.is_err() {
                        ::log::warn!("Download worker {} lost its controller", worker_id);
                        break;
                    }
                }
                drop(permit);
            });
        }
    });

    report_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(root: &Path) -> Downloader {
        Downloader::new(&FingerprintProfile::default(), root, Duration::from_secs(5))
            .unwrap()
            .with_retries(1, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_download_creates_parents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/css/deep/a.css"))
            .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/css/deep/a.css", server.uri())).unwrap();
        let written = downloader(dir.path())
            .download(&url, Path::new("css/deep/a.css"))
            .await
            .unwrap();

        assert_eq!(written, dir.path().join("css/deep/a.css"));
        assert_eq!(std::fs::read_to_string(written).unwrap(), "body{}");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(dir.path());
        downloader.write(b"first version", Path::new("a.txt")).await.unwrap();
        downloader.write(b"second", Path::new("a.txt")).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn test_missing_resource_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/gone.png", server.uri())).unwrap();
        let err = downloader(dir.path()).fetch(&url).await.unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/flaky.js", server.uri())).unwrap();
        let err = downloader(dir.path()).fetch(&url).await.unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/ua", server.uri())).unwrap();
        assert_eq!(downloader(dir.path()).fetch(&url).await.unwrap(), b"ok");

        // The UA contains commas, so compare the raw header value
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let user_agent = requests[0].headers.get("user-agent").unwrap();
        assert_eq!(
            user_agent.to_str().unwrap(),
            crate::fingerprint::DEFAULT_USER_AGENT
        );
        assert_eq!(
            requests[0].headers.get("accept-language").unwrap().to_str().unwrap(),
            "en-US,en;q=0.9"
        );
    }

    #[tokio::test]
    async fn test_pool_reports_every_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.js"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            DownloadJob {
                local_path: PathBuf::from("ok.png"),
                urls: vec![Url::parse(&format!("{}/ok.png", server.uri())).unwrap()],
            },
            DownloadJob {
                local_path: PathBuf::from("broken.js"),
                urls: vec![Url::parse(&format!("{}/broken.js", server.uri())).unwrap()],
            },
        ];

        let mut rx = spawn_downloads(Arc::new(downloader(dir.path())), jobs, 2);
        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(report) = rx.recv().await {
            match report.result {
                Ok(_) => succeeded += 1,
                Err(_) => failed += 1,
            }
        }

        assert_eq!((succeeded, failed), (1, 1));
        assert!(dir.path().join("ok.png").exists());
        assert!(!dir.path().join("broken.js").exists());
    }
}
