//! The narrow slice of browser automation the collector needs.
//!
//! Keeping this behind traits lets the collection loop run against an
//! in-memory fake in tests and against headless Chromium in production.

use std::time::Duration;

use crate::error::HarvestError;

/// Starts isolated browser sessions, one per query.
pub trait BrowserLauncher {
    type Page: BrowserPage;

    /// Failure here is fatal for the run.
    fn launch(&self) -> Result<Self::Page, HarvestError>;
}

/// A single open page. Owned exclusively by one harvest session.
pub trait BrowserPage {
    type Element;

    fn navigate(&mut self, url: &str) -> Result<(), HarvestError>;

    fn query_elements(&mut self, selector: &str) -> Result<Vec<Self::Element>, HarvestError>;

    fn click(&mut self, element: &Self::Element) -> Result<(), HarvestError>;

    fn read_attribute(
        &mut self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, HarvestError>;

    fn current_url(&mut self) -> Result<String, HarvestError>;

    /// Asks the page to load more results.
    fn scroll_to_bottom(&mut self) -> Result<(), HarvestError>;

    fn wait(&mut self, duration: Duration);

    /// Releases the page and its browser process.
    fn close(self) -> Result<(), HarvestError>;
}
