use std::path::PathBuf;
use thiserror::Error;

/// Errors that can end a mirror run or a single page visit
#[derive(Debug, Error)]
pub enum MirrorError {
    /// No browser session could be created
    #[error("failed to launch browser session via {endpoint}: {message}")]
    Launch { endpoint: String, message: String },

    /// Network, TLS, DNS or WebDriver failure while loading a page
    #[error("failed to render {url}: {message}")]
    Navigation { url: String, message: String },

    /// The page did not settle before the render deadline
    #[error("timed out after {timeout_ms} ms waiting for {url} to settle")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// In-page evaluation failed or returned something unexpected
    #[error("script evaluation failed on {url}: {message}")]
    Script { url: String, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl MirrorError {
    /// Whether this error came from loading a page (as opposed to setup)
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            MirrorError::Navigation { .. }
                | MirrorError::NavigationTimeout { .. }
                | MirrorError::Script { .. }
        )
    }
}

/// Failure to fetch or persist a single resource
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            DownloadError::Status { status, .. } => {
                *status == 403 || *status == 429 || *status >= 500
            }
            DownloadError::Io { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retry_classification() {
        let retry = |status| DownloadError::Status {
            url: "https://example.test/a.png".to_string(),
            status,
        };
        assert!(retry(503).is_retryable());
        assert!(retry(429).is_retryable());
        assert!(retry(403).is_retryable());
        assert!(!retry(404).is_retryable());
    }

    #[test]
    fn test_navigation_errors() {
        let timeout = MirrorError::NavigationTimeout {
            url: "https://example.test/".to_string(),
            timeout_ms: 100,
        };
        assert!(timeout.is_navigation());

        let launch = MirrorError::Launch {
            endpoint: "http://localhost:4444".to_string(),
            message: "refused".to_string(),
        };
        assert!(!launch.is_navigation());
    }
}
