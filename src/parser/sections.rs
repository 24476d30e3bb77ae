//! Locating profile sections and overlays, with expansion and cleanup.
//!
//! Sections are found through ordered locator lists. A section can carry
//! expansion toggles ("see more", "Show all"); expanding re-reads the
//! section from the page root because the toggle often replaces the
//! content. Anything opened here is closed again before control returns.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use super::strategy::{locate, Locator};
use crate::browser::{Page, Region};

/// A named section of the profile page.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub name: &'static str,
    /// Tried in order; the first that matches defines the section.
    pub locators: &'static [Locator],
    /// Toggles inside the section that reveal truncated content.
    pub expand: &'static [Locator],
}

/// A modal reached through one of several opener paths.
#[derive(Debug, Clone, Copy)]
pub struct OverlaySpec {
    pub name: &'static str,
    /// Each opener is a sequence of clicks from the page root.
    pub openers: &'static [&'static [Locator]],
    pub modal: &'static [Locator],
}

const DISMISS_IN_OVERLAY: Locator =
    Locator::Css("button[aria-label*='Dismiss'], button[aria-label*='Close']");
const DISMISS_ON_PAGE: Locator = Locator::Css("button.artdeco-modal__dismiss");
/// What an expansion that opened a layer over the page looks like.
const OVERLAY_MARKERS: &[Locator] = &[
    Locator::Css("div[class*='artdeco-modal']"),
    Locator::Css("[role='dialog']"),
];

pub struct Resolved<R> {
    pub region: R,
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionResolver {
    pub click_settle: Duration,
    pub expand_timeout: Duration,
}

impl SectionResolver {
    pub fn new(click_settle: Duration, expand_timeout: Duration) -> Self {
        Self {
            click_settle,
            expand_timeout,
        }
    }

    fn find<P: Page>(&self, page: &P, locators: &[Locator]) -> Result<Option<P::Region>> {
        let root = page.root()?;
        for locator in locators {
            if let Some(found) = locator.find_first(&root)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Find `spec`'s section. With `expand`, click its first visible toggle
    /// once, wait for the page to settle and re-resolve; if the section can no
    /// longer be found afterwards the pre-expansion region is returned.
    pub fn resolve<P: Page>(
        &self,
        page: &P,
        spec: &SectionSpec,
        expand: bool,
    ) -> Result<Option<Resolved<P::Region>>> {
        let Some(region) = self.find(page, spec.locators)? else {
            debug!("Section '{}' not on page", spec.name);
            return Ok(None);
        };
        if !expand || spec.expand.is_empty() {
            return Ok(Some(Resolved {
                region,
                expanded: false,
            }));
        }

        let mut toggle = None;
        for locator in spec.expand {
            if let Some(t) = locator.find_first(&region)? {
                toggle = Some(t);
                break;
            }
        }
        let Some(toggle) = toggle else {
            return Ok(Some(Resolved {
                region,
                expanded: false,
            }));
        };

        if let Err(e) = toggle.click() {
            warn!("Could not expand '{}': {}", spec.name, e);
            return Ok(Some(Resolved {
                region,
                expanded: false,
            }));
        }
        if !page.settle(self.expand_timeout)? {
            debug!("'{}' still changing after {:?}", spec.name, self.expand_timeout);
        }

        match self.find(page, spec.locators)? {
            Some(fresh) => Ok(Some(Resolved {
                region: fresh,
                expanded: true,
            })),
            None => {
                debug!("'{}' gone after expansion, using original region", spec.name);
                Ok(Some(Resolved {
                    region,
                    expanded: true,
                }))
            }
        }
    }

    /// Run `f` on the (expanded) section. If the expansion opened an
    /// overlay it is closed before returning; inline expansions leave the
    /// page alone. `Ok(None)` when the section is absent.
    pub fn with_section<P: Page, T>(
        &self,
        page: &P,
        spec: &SectionSpec,
        f: impl FnOnce(&P::Region) -> T,
    ) -> Result<Option<T>> {
        let Some(resolved) = self.resolve(page, spec, true)? else {
            return Ok(None);
        };
        let value = f(&resolved.region);
        if resolved.expanded {
            match self.find(page, OVERLAY_MARKERS) {
                Ok(Some(overlay)) => {
                    self.close_overlay(page, Some(&overlay));
                }
                Ok(None) => debug!("'{}' expanded in place", spec.name),
                Err(e) => debug!("Overlay check after '{}' failed: {}", spec.name, e),
            }
        }
        Ok(Some(value))
    }

    /// Open the overlay, run `f` on it, and close it again. `Ok(None)` when
    /// no opener path works or no modal shows up.
    pub fn with_modal<P: Page, T>(
        &self,
        page: &P,
        spec: &OverlaySpec,
        f: impl FnOnce(&P::Region) -> T,
    ) -> Result<Option<T>> {
        let mut opened = false;
        for opener in spec.openers {
            if self.click_path(page, opener)? {
                opened = true;
                break;
            }
        }
        if !opened {
            debug!("No way to open '{}'", spec.name);
            return Ok(None);
        }

        let Some(modal) = self.find(page, spec.modal)? else {
            debug!("'{}' opener clicked but no modal appeared", spec.name);
            self.close_overlay(page, None);
            return Ok(None);
        };
        let value = f(&modal);
        self.close_overlay(page, Some(&modal));
        Ok(Some(value))
    }

    /// Click each step of `path` from a fresh root. False as soon as a step
    /// is missing or its click fails.
    fn click_path<P: Page>(&self, page: &P, path: &[Locator]) -> Result<bool> {
        for (i, step) in path.iter().enumerate() {
            let Some(el) = step.find_first(&page.root()?)? else {
                if i > 0 {
                    // A menu from an earlier step is left open.
                    self.close_overlay(page, None);
                }
                return Ok(false);
            };
            if let Err(e) = el.click() {
                debug!("Click on {} failed: {}", step, e);
                return Ok(false);
            }
            page.pause(self.click_settle);
        }
        Ok(!path.is_empty())
    }

    /// Dismiss an open overlay: a dismiss button inside `overlay`, then the
    /// page's modal dismiss button, then Escape. Without an overlay region
    /// only the last two are tried. Failure is logged, never raised.
    pub fn close_overlay<P: Page>(&self, page: &P, overlay: Option<&P::Region>) -> bool {
        if let Some(overlay) = overlay {
            if self.try_click(page, overlay, DISMISS_IN_OVERLAY) {
                return true;
            }
        }
        let root = match page.root() {
            Ok(root) => Some(root),
            Err(e) => {
                debug!("Page root unavailable while closing overlay: {}", e);
                None
            }
        };
        if let Some(root) = &root {
            if self.try_click(page, root, DISMISS_ON_PAGE) {
                return true;
            }
        }
        match page.press_escape() {
            Ok(()) => {
                page.pause(self.click_settle);
                true
            }
            Err(e) => {
                warn!("Could not close overlay: {}", e);
                false
            }
        }
    }

    fn try_click<P: Page>(&self, page: &P, scope: &P::Region, locator: Locator) -> bool {
        match locate(scope, &[locator]) {
            Ok(Some(button)) => match button.click() {
                Ok(()) => {
                    page.pause(self.click_settle);
                    true
                }
                Err(e) => {
                    debug!("Dismiss via {} failed: {}", locator, e);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                debug!("Lookup of {} failed: {}", locator, e);
                false
            }
        }
    }
}

// ── Tests ──
