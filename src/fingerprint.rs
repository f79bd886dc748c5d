use serde_json::{Map, Value, json};

/// Desktop Chrome on macOS
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Overrides for the properties automation detectors look at first.
/// Each snippet is independent so one failing does not skip the others.
const NAVIGATOR_OVERRIDES: &[&str] = &[
    // navigator.webdriver is true under automation
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => false,
        configurable: true
    });
    "#,
    r#"
    window.chrome = window.chrome || {};
    window.chrome.runtime = window.chrome.runtime || {};
    "#,
    // Headless sessions report no plugins
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Browser identity presented to the target site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub accept_language: String,
    /// Extra headers the engine adds to every request, subresources included.
    /// `Sec-Fetch-*` is left to the engine since it varies per request type.
    pub headers: Vec<(String, String)>,
    /// Scripts installed before any page script runs
    pub overrides: Vec<String>,
    pub headless: bool,
}

impl Default for FingerprintProfile {
    fn default() -> Self {
        let accept_language = "en-US,en;q=0.9".to_string();
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
            ("Accept-Language", accept_language.as_str()),
            ("Accept-Encoding", "gzip, deflate, br"),
            ("Connection", "keep-alive"),
            ("Upgrade-Insecure-Requests", "1"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: (1920, 1080),
            accept_language,
            headers,
            overrides: NAVIGATOR_OVERRIDES.iter().map(|s| s.to_string()).collect(),
            headless: true,
        }
    }
}

impl FingerprintProfile {
    /// Set whether the engine runs without a visible window
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Command-line switches for the browser process
    pub fn launch_args(&self) -> Vec<String> {
        let (width, height) = self.viewport;
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-infobars".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--window-size={},{}", width, height),
            format!("--user-agent={}", self.user_agent),
            format!("--lang={}", self.primary_language()),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }
        args
    }

    /// WebDriver capabilities requesting a Chromium session with this identity
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": self.launch_args(),
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        caps
    }

    /// Headers as a JSON object, the shape DevTools expects
    pub fn headers_json(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(headers)
    }

    /// All overrides joined into one script
    pub fn override_script(&self) -> String {
        self.overrides
            .iter()
            .map(|snippet| format!("try {{ {} }} catch (e) {{}}", snippet.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn primary_language(&self) -> &str {
        self.accept_language
            .split(',')
            .next()
            .unwrap_or("en-US")
            .trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let profile = FingerprintProfile::default();
        let names: Vec<&str> = profile.headers.iter().map(|(n, _)| n.as_str()).collect();
        for expected in [
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "Connection",
            "Upgrade-Insecure-Requests",
        ] {
            assert!(names.contains(&expected), "missing header {}", expected);
        }
    }

    #[test]
    fn test_no_document_only_headers() {
        let headers = FingerprintProfile::default().headers_json();
        let headers = headers.as_object().unwrap();
        assert!(headers.keys().all(|name| !name.starts_with("Sec-Fetch")));
        assert_eq!(headers["Accept-Language"], "en-US,en;q=0.9");
    }

    #[test]
    fn test_capabilities_hide_automation() {
        let caps = FingerprintProfile::default().capabilities();
        let options = &caps["goog:chromeOptions"];
        let args: Vec<&str> = options["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a.as_str().unwrap())
            .collect();

        assert!(args.contains(&"--disable-blink-features=AutomationControlled"));
        assert!(args.contains(&"--no-sandbox"));
        assert!(args.contains(&"--window-size=1920,1080"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert_eq!(options["excludeSwitches"][0], "enable-automation");
        assert_eq!(options["useAutomationExtension"], false);
    }

    #[test]
    fn test_headed_profile_drops_headless_flag() {
        let args = FingerprintProfile::default()
            .with_headless(false)
            .launch_args();
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--lang=en-US".to_string()));
    }

    #[test]
    fn test_override_script_covers_detection_signals() {
        let script = FingerprintProfile::default().override_script();
        assert!(script.contains("'webdriver'"));
        assert!(script.contains("'plugins'"));
        assert!(script.contains("'languages'"));
    }
}
