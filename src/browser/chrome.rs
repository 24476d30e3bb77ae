use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use headless_chrome::protocol::cdp::DOM::NodeId;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tracing::{debug, info};

use super::{Page, Region};
use crate::config::BrowserConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// One browser process with the single tab every interaction goes through.
/// Dropping it kills the process.
pub struct ChromeSession {
    _browser: Browser,
    page: ChromePage,
}

impl ChromeSession {
    pub fn launch(cfg: &BrowserConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(cfg.headless)
            .sandbox(false)
            .window_size(Some((cfg.window_width, cfg.window_height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-notifications"),
            ])
            .build()
            .map_err(|e| anyhow!("invalid browser launch options: {}", e))?;

        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_default_timeout(Duration::from_millis(cfg.element_timeout_ms));
        if let Some(ua) = cfg.user_agent.as_deref() {
            tab.set_user_agent(ua, None, None)?;
        }
        info!("Launched Chrome (headless: {})", cfg.headless);

        Ok(ChromeSession {
            _browser: browser,
            page: ChromePage { tab },
        })
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

/// A DOM node addressed by id; the element handle is re-resolved per call
/// so regions can outlive a single borrow of the tab.
pub struct ChromeRegion {
    tab: Arc<Tab>,
    node_id: NodeId,
}

impl ChromeRegion {
    fn element(&self) -> Result<Element<'_>> {
        Element::new(&self.tab, self.node_id)
    }
}

impl Region for ChromeRegion {
    fn find_all(&self, css: &str) -> Result<Vec<Self>> {
        let found = self.tab.run_query_selector_all_on_node(self.node_id, css)?;
        Ok(found
            .into_iter()
            .map(|el| ChromeRegion {
                tab: Arc::clone(&self.tab),
                node_id: el.node_id,
            })
            .collect())
    }

    fn text(&self) -> Result<String> {
        self.element()?.get_inner_text()
    }

    fn attr(&self, name: &str) -> Result<Option<String>> {
        self.element()?.get_attribute_value(name)
    }

    fn click(&self) -> Result<()> {
        self.element()?.click()?;
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        self.element()?.type_into(text)?;
        Ok(())
    }
}

impl ChromePage {
    fn eval_u64(&self, js: &str) -> Result<u64> {
        let obj = self.tab.evaluate(js, false)?;
        obj.value
            .as_ref()
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("script returned no number: {}", js))
    }
}

impl Page for ChromePage {
    type Region = ChromeRegion;

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)?
            .wait_until_navigated()
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn root(&self) -> Result<ChromeRegion> {
        let doc = self.tab.get_document()?;
        Ok(ChromeRegion {
            tab: Arc::clone(&self.tab),
            node_id: doc.node_id,
        })
    }

    fn wait_for(&self, css: &str, timeout: Duration) -> Result<Option<ChromeRegion>> {
        let start = Instant::now();
        loop {
            if let Some(found) = self.root()?.find_first(css)? {
                return Ok(Some(found));
            }
            if start.elapsed() >= timeout {
                debug!("'{}' did not appear within {:?}", css, timeout);
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn settle(&self, timeout: Duration) -> Result<bool> {
        let start = Instant::now();
        let js = "document.body ? document.body.innerText.length : 0";
        let mut last = self.eval_u64(js)?;
        while start.elapsed() < timeout {
            std::thread::sleep(POLL_INTERVAL);
            let now = self.eval_u64(js)?;
            if now == last {
                return Ok(true);
            }
            last = now;
        }
        Ok(false)
    }

    fn press_escape(&self) -> Result<()> {
        self.tab.press_key("Escape")?;
        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<u64> {
        self.eval_u64("window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight")
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ── Tests ──
