use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "LINKEDIN";

/// Settings layered from defaults, an optional TOML file, then
/// `LINKEDIN__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub browser: BrowserConfig,
    pub scrape: ScrapeConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    /// Bound for waiting on a page's primary marker (login form, nav bar,
    /// connection cards).
    pub element_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub max_connections: usize,
    pub scroll_pause_ms: u64,
    pub max_scroll_rounds: usize,
    pub profile_settle_min_ms: u64,
    pub profile_settle_max_ms: u64,
    pub between_profiles_min_ms: u64,
    pub between_profiles_max_ms: u64,
    /// Pause after clicks that open menus, modals or close overlays.
    pub click_settle_ms: u64,
    /// Bound on waiting for expanded "show more" content to stabilise.
    pub expand_timeout_ms: u64,
    pub export_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub listen_addr: String,
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/linkedin.sqlite".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            element_timeout_ms: 10_000,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            scroll_pause_ms: 2_000,
            max_scroll_rounds: 50,
            profile_settle_min_ms: 3_000,
            profile_settle_max_ms: 5_000,
            between_profiles_min_ms: 5_000,
            between_profiles_max_ms: 8_000,
            click_settle_ms: 1_000,
            expand_timeout_ms: 2_000,
            export_path: "linkedin_connections.json".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            cors_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config {:?}", path))?;
        raw.try_deserialize().context("Invalid configuration")
    }
}

impl BrowserConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

impl ScrapeConfig {
    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn expand_timeout(&self) -> Duration {
        Duration::from_millis(self.expand_timeout_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

// ── Tests ──
