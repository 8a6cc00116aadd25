//! Run configuration.
//!
//! Everything a run needs is fixed at construction time. A handful of knobs can be
//! overridden through `TOPCHART_*` environment variables; `headless` is not one of them.

use std::path::PathBuf;
use std::time::Duration;
use topchart_core::{Error, RenderRequest, Result, MAX_ITEMS};

use crate::dom::ITEM_SELECTOR;

pub const DEFAULT_CHART_URL: &str = "https://www.imdb.com/chart/top/";
pub const DEFAULT_OUTPUT: &str = "imdb_top_movies.csv";
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_SETTLE_MS: u64 = 2_000;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    pub url: String,
    pub output: PathBuf,
    pub headless: bool,
    pub wait_timeout_ms: u64,
    pub settle_ms: u64,
    pub user_agent: String,
    /// Render from a saved HTML file instead of launching a browser.
    pub snapshot_html: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHART_URL.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            headless: true,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            snapshot_html: None,
        }
    }
}

impl ScrapeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env)
    }

    /// Build from an arbitrary key lookup (tests pass a map instead of the process env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(u) = lookup("TOPCHART_URL") {
            cfg.url = u;
        }
        validate_url(&cfg.url)?;
        if let Some(p) = lookup("TOPCHART_OUT") {
            cfg.output = PathBuf::from(p);
        }
        if let Some(v) = lookup("TOPCHART_WAIT_TIMEOUT_MS") {
            cfg.wait_timeout_ms = parse_ms("TOPCHART_WAIT_TIMEOUT_MS", &v)?.clamp(1_000, 300_000);
        }
        if let Some(v) = lookup("TOPCHART_SETTLE_MS") {
            cfg.settle_ms = parse_ms("TOPCHART_SETTLE_MS", &v)?.min(60_000);
        }
        cfg.snapshot_html = lookup("TOPCHART_SNAPSHOT_HTML").map(PathBuf::from);
        Ok(cfg)
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            url: self.url.clone(),
            headless: self.headless,
            wait_timeout_ms: self.wait_timeout_ms,
            settle_ms: self.settle_ms,
            item_selector: ITEM_SELECTOR.to_string(),
            max_items: MAX_ITEMS,
            user_agent: self.user_agent.clone(),
        }
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let u = url::Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    match u.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidUrl(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

fn parse_ms(key: &str, v: &str) -> Result<u64> {
    v.parse::<u64>()
        .map_err(|_| Error::Config(format!("{key} must be milliseconds, got {v:?}")))
}

/// Non-empty, trimmed env value.
pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn env_truthy(key: &str) -> bool {
    matches!(
        env(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}
