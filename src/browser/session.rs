use super::Renderer;
use super::cdp::CdpCommand;
use crate::discovery::DISCOVERY_SCRIPT;
use crate::error::MirrorError;
use crate::fingerprint::FingerprintProfile;
use crate::parsers::RawResources;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use url::Url;

/// Endpoints tried when the configured WebDriver URL refuses a session
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444",
];

/// How often readiness is probed while a page loads
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long the resource count must stay unchanged to count as network idle
const SETTLE_WINDOW: Duration = Duration::from_millis(500);

const QUIESCENCE_PROBE: &str = r#"
return {
    ready: document.readyState,
    resources: performance.getEntriesByType('resource').length
};
"#;

/// Decides when a loading page has gone idle: the document is complete and
/// the resource count has not changed for `window`
#[derive(Debug)]
struct Settle {
    window: Duration,
    last_count: Option<u64>,
    stable_since: Option<Instant>,
}

impl Settle {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_count: None,
            stable_since: None,
        }
    }

    /// Records one probe taken at `now` and returns true once the page is idle
    fn observe(&mut self, complete: bool, count: Option<u64>, now: Instant) -> bool {
        let unchanged = count.is_some() && count == self.last_count;
        if complete && unchanged {
            let since = *self.stable_since.get_or_insert(now);
            return now.duration_since(since) >= self.window;
        }

        ::log::trace!("Page not idle yet: complete={} resources={:?}", complete, count);
        self.last_count = count;
        self.stable_since = if complete && count.is_some() {
            Some(now)
        } else {
            None
        };
        false
    }
}

/// Runs a page load under `deadline`, reporting expiry as a navigation timeout
async fn within<F>(url: &Url, deadline: Duration, load: F) -> Result<(), MirrorError>
where
    F: Future<Output = Result<(), MirrorError>>,
{
    match timeout(deadline, load).await {
        Ok(result) => result,
        Err(_) => Err(MirrorError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms: deadline.as_millis() as u64,
        }),
    }
}

/// A single WebDriver session dressed up as an ordinary browser
pub struct BrowserSession {
    client: Client,
    endpoint: String,
    /// Overrides that could not be installed ahead of navigation
    late_overrides: Option<String>,
    settle_delay: Duration,
    current_url: Option<Url>,
}

impl BrowserSession {
    /// Starts a browser session presenting `profile`.
    ///
    /// `settle_delay` is the pause after the page goes idle and before its
    /// HTML is read.
    pub async fn open(
        profile: &FingerprintProfile,
        webdriver_url: &str,
        settle_delay: Duration,
    ) -> Result<Self, MirrorError> {
        let (client, endpoint) = connect_to_webdriver(profile, webdriver_url).await?;

        let (width, height) = profile.viewport;
        if let Err(e) = client.set_window_size(width, height).await {
            ::log::warn!("Could not resize browser window to {}x{}: {}", width, height, e);
        }

        let mut session = Self {
            client,
            endpoint,
            late_overrides: None,
            settle_delay,
            current_url: None,
        };

        if let Err(e) = session.install_profile(profile).await {
            ::log::warn!(
                "DevTools bridge unavailable at {} ({}); overrides will be applied after each load",
                session.endpoint,
                e
            );
            session.late_overrides = Some(profile.override_script());
        }

        Ok(session)
    }

    /// Registers headers, user agent and navigator overrides ahead of any navigation
    async fn install_profile(&self, profile: &FingerprintProfile) -> Result<(), CmdError> {
        let commands = [
            CdpCommand::new("Network.enable", json!({})),
            CdpCommand::new(
                "Network.setUserAgentOverride",
                json!({
                    "userAgent": profile.user_agent,
                    "acceptLanguage": profile.accept_language,
                }),
            ),
            CdpCommand::new(
                "Network.setExtraHTTPHeaders",
                json!({ "headers": profile.headers_json() }),
            ),
            CdpCommand::new(
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": profile.override_script() }),
            ),
        ];

        for command in commands {
            ::log::debug!("Sending {} to {}", command.method(), self.endpoint);
            self.client.issue_cmd(command).await?;
        }
        Ok(())
    }

    /// Polls until the document is complete and no new resources have
    /// started loading for [`SETTLE_WINDOW`]
    async fn wait_for_quiescence(&self) -> Result<(), CmdError> {
        let mut settle = Settle::new(SETTLE_WINDOW);

        loop {
            let probe = self.client.execute(QUIESCENCE_PROBE, vec![]).await?;
            let complete = probe["ready"].as_str() == Some("complete");
            let count = probe["resources"].as_u64();

            if settle.observe(complete, count, Instant::now()) {
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn load(&self, url: &Url) -> Result<(), MirrorError> {
        let navigation_error = |e: CmdError| MirrorError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        self.client
            .goto(url.as_str())
            .await
            .map_err(navigation_error)?;

        if let Some(script) = &self.late_overrides {
            if let Err(e) = self.client.execute(script, vec![]).await {
                ::log::debug!("Late overrides failed on {}: {}", url, e);
            }
        }

        self.wait_for_quiescence().await.map_err(navigation_error)
    }
}

impl Renderer for BrowserSession {
    async fn render(&mut self, url: &Url, render_timeout: Duration) -> Result<String, MirrorError> {
        let started = Instant::now();
        ::log::debug!("RENDER: {}", url);

        within(url, render_timeout, self.load(url)).await?;

        // Pause like a person would before reading the page
        sleep(self.settle_delay).await;

        let html = self
            .client
            .source()
            .await
            .map_err(|e| MirrorError::Navigation {
                url: url.to_string(),
                message: format!("getting source: {}", e),
            })?;

        self.current_url = Some(url.clone());
        ::log::debug!(
            "Rendered {} ({} bytes) in {:.2} seconds",
            url,
            html.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(html)
    }

    async fn query_resources(&mut self) -> Result<RawResources, MirrorError> {
        let url = self
            .current_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default();

        let value = self
            .client
            .execute(DISCOVERY_SCRIPT, vec![])
            .await
            .map_err(|e| MirrorError::Script {
                url: url.clone(),
                message: e.to_string(),
            })?;

        serde_json::from_value(value).map_err(|e| MirrorError::Script {
            url,
            message: e.to_string(),
        })
    }

    async fn close(self) -> Result<(), MirrorError> {
        ::log::debug!("Closing browser session at {}", self.endpoint);
        self.client.close().await.map_err(|e| MirrorError::Navigation {
            url: self.endpoint.clone(),
            message: format!("closing session: {}", e),
        })
    }
}

/// Connects to the WebDriver instance, falling back to well-known local endpoints
async fn connect_to_webdriver(
    profile: &FingerprintProfile,
    webdriver_url: &str,
) -> Result<(Client, String), MirrorError> {
    let candidates = std::iter::once(webdriver_url).chain(
        FALLBACK_WEBDRIVER_URLS
            .iter()
            .copied()
            .filter(|url| *url != webdriver_url),
    );

    let mut first_error = None;
    for endpoint in candidates {
        let mut builder = ClientBuilder::native();
        builder.capabilities(profile.capabilities());

        match builder.connect(endpoint).await {
            Ok(client) => {
                ::log::info!("Connected to WebDriver at {}", endpoint);
                return Ok((client, endpoint.to_string()));
            }
            Err(e) => {
                ::log::debug!("WebDriver at {} refused a session: {}", endpoint, e);
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(MirrorError::Launch {
        endpoint: webdriver_url.to_string(),
        message: first_error.unwrap_or_else(|| "no endpoint reachable".to_string()),
    })
}
