//! Page and element seams between the extraction pipeline and the driver.
//!
//! The pipeline only ever talks to [`Page`] and [`Region`]. Production runs
//! against headless Chrome ([`chrome`]); tests run against static HTML
//! fixtures.

pub mod chrome;
#[cfg(test)]
pub mod fixture;

use std::time::Duration;

use anyhow::Result;

/// A scoped element on a page. Lookups only search descendants.
///
/// An empty lookup result is `Ok(vec![])`; `Err` means the driver itself
/// failed (stale node, closed tab, lost connection).
pub trait Region: Sized {
    fn find_all(&self, css: &str) -> Result<Vec<Self>>;
    fn text(&self) -> Result<String>;
    fn attr(&self, name: &str) -> Result<Option<String>>;
    fn click(&self) -> Result<()>;
    fn type_text(&self, text: &str) -> Result<()>;

    fn find_first(&self, css: &str) -> Result<Option<Self>> {
        Ok(self.find_all(css)?.into_iter().next())
    }
}

/// One browser tab. All calls on a page are sequential.
pub trait Page {
    type Region: Region;

    fn navigate(&self, url: &str) -> Result<()>;
    fn current_url(&self) -> Result<String>;
    /// The document root, re-read on every call.
    fn root(&self) -> Result<Self::Region>;
    /// Poll for `css` until it appears or `timeout` passes.
    fn wait_for(&self, css: &str, timeout: Duration) -> Result<Option<Self::Region>>;
    /// Wait until rendered content stops changing, at most `timeout`.
    /// Returns whether it stabilised in time.
    fn settle(&self, timeout: Duration) -> Result<bool>;
    fn press_escape(&self) -> Result<()>;
    /// Scroll to the bottom and report the new document height.
    fn scroll_to_bottom(&self) -> Result<u64>;
    fn pause(&self, duration: Duration);
}
