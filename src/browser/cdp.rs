use fantoccini::wd::WebDriverCompatibleCommand;
use serde_json::{Value, json};
use url::Url;

/// A DevTools protocol call tunnelled through chromedriver's
/// `/session/{id}/goog/cdp/execute` endpoint.
#[derive(Debug, Clone)]
pub(crate) struct CdpCommand {
    method: &'static str,
    params: Value,
}

impl CdpCommand {
    pub(crate) fn new(method: &'static str, params: Value) -> Self {
        Self { method, params }
    }

    pub(crate) fn method(&self) -> &'static str {
        self.method
    }

    fn body(&self) -> String {
        json!({ "cmd": self.method, "params": self.params }).to_string()
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(&self, base_url: &Url, session_id: Option<&str>) -> Result<Url, url::ParseError> {
        let session = session_id.unwrap_or_default();
        base_url.join(&format!("session/{}/goog/cdp/execute", session))
    }

    fn method_and_body(&self, _request_url: &Url) -> (http::Method, Option<String>) {
        (http::Method::POST, Some(self.body()))
    }
}
