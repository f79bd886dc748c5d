//! Rendering pages in a real browser engine.
//!
//! The crawl controller only needs "render a URL, then let me query the live
//! DOM", which is the [`Renderer`] trait. [`BrowserSession`] implements it
//! over WebDriver.

mod cdp;
mod session;

pub use session::BrowserSession;

use crate::error::MirrorError;
use crate::parsers::RawResources;
use std::time::Duration;
use url::Url;

/// Renders pages and answers read-only queries about the current document.
///
/// One page is live at a time: [`Renderer::query_resources`] reads the page
/// most recently returned by [`Renderer::render`].
#[allow(async_fn_in_trait)]
pub trait Renderer {
    /// Navigate to `url`, wait for it to settle, and return the rendered HTML
    async fn render(&mut self, url: &Url, timeout: Duration) -> Result<String, MirrorError>;

    /// Read resource references from the live document
    async fn query_resources(&mut self) -> Result<RawResources, MirrorError>;

    /// Release the engine. Called once, on every exit path.
    async fn close(self) -> Result<(), MirrorError>
    where
        Self: Sized;
}
