use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::notifier::DEFAULT_TELEGRAM_API_BASE;
use crate::poller::PollConfig;
use crate::price::DEFAULT_PRICE_API_BASE;
use crate::source::SourceKind;

/// Non-secret tunables, read from an optional JSON file. Every field has a
/// default so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub source: SourceKind,
    pub source_url: Option<String>,
    pub poll_interval_secs: u64,
    pub backoff_secs: u64,
    pub max_items: usize,
    pub request_timeout_secs: u64,
    /// Skip disclosures older than this many minutes; unset keeps all.
    pub recent_window_minutes: Option<u64>,
    pub price_lookup: bool,
    pub price_api_base: String,
    pub telegram_api_base: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Html,
            source_url: None,
            poll_interval_secs: 300,
            backoff_secs: 60,
            max_items: 10,
            request_timeout_secs: 10,
            recent_window_minutes: None,
            price_lookup: true,
            price_api_base: DEFAULT_PRICE_API_BASE.to_owned(),
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_owned(),
        }
    }
}

impl RelayConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            backoff: Duration::from_secs(self.backoff_secs),
            max_items: self.max_items.max(1),
            recent_window: self
                .recent_window_minutes
                .map(|m| Duration::from_secs(m.saturating_mul(60))),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
