//! Upstream disclosure sources.
//!
//! Every adapter turns one remote document into a list of [`Announcement`]s
//! in the order the source publishes them (newest first for KAP). A record
//! missing one of its identity fields is logged and dropped; only a failure
//! to get or decode the document as a whole is an error.

pub mod api;
pub mod feed;
pub mod html;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::announcement::Announcement;
use crate::error::{ConfigError, SourceError};

pub use self::api::ApiSource;
pub use self::html::HtmlSource;
pub use self::feed::RssSource;

/// The KAP front end refuses the default reqwest agent.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Announcement>, SourceError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Html,
    Rss,
    Api,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Html => "html",
            SourceKind::Rss => "rss",
            SourceKind::Api => "api",
        })
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(SourceKind::Html),
            "rss" => Ok(SourceKind::Rss),
            "api" | "json" => Ok(SourceKind::Api),
            other => Err(ConfigError::UnknownSource(other.to_owned())),
        }
    }
}

/// Picks the adapter for `kind`; `url` overrides its default endpoint.
pub fn build_source(
    kind: SourceKind,
    url: Option<&str>,
    client: Client,
) -> Box<dyn AnnouncementSource> {
    match (kind, url) {
        (SourceKind::Html, Some(url)) => Box::new(HtmlSource::with_url(client, url)),
        (SourceKind::Html, None) => Box::new(HtmlSource::new(client)),
        (SourceKind::Rss, Some(url)) => Box::new(RssSource::with_url(client, url)),
        (SourceKind::Rss, None) => Box::new(RssSource::new(client)),
        (SourceKind::Api, Some(url)) => Box::new(ApiSource::with_url(client, url)),
        (SourceKind::Api, None) => Box::new(ApiSource::new(client)),
    }
}

pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await?;
    Ok(ensure_success(response)?.text().await?)
}

fn ensure_success(response: Response) -> Result<Response, SourceError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SourceError::Status(response.status()))
    }
}

/// Replaces the relative day word "Bugün" (today) with `today` as
/// `YYYY-MM-DD`, so "Bugün 10:00" becomes "2024-01-01 10:00".
pub fn normalize_time(raw: &str, today: NaiveDate) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("Bugün") {
        trimmed.replace("Bugün", &today.format("%Y-%m-%d").to_string())
    } else {
        trimmed.to_owned()
    }
}

/// KAP publishes in Istanbul time, which has been a fixed UTC+3 since 2016.
const PORTAL_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Offset disclosure times are reported in, independent of the host's `TZ`.
pub fn portal_offset() -> FixedOffset {
    FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Calendar date on the portal at instant `now`.
pub fn portal_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&portal_offset()).date_naive()
}

pub(crate) fn portal_today() -> NaiveDate {
    portal_date(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("HTML".parse::<SourceKind>().unwrap(), SourceKind::Html);
        assert_eq!("json".parse::<SourceKind>().unwrap(), SourceKind::Api);
        assert!("selenium".parse::<SourceKind>().is_err());
    }

    #[test]
    fn today_word_is_replaced() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(normalize_time(" Bugün 10:00 ", today), "2024-01-01 10:00");
        assert_eq!(normalize_time("31.12.2023 09:15", today), "31.12.2023 09:15");
    }

    #[test]
    fn today_follows_istanbul_calendar_not_utc() {
        let late_utc = DateTime::parse_from_rfc3339("2024-01-01T21:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(portal_date(late_utc), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let early_utc = DateTime::parse_from_rfc3339("2024-01-01T20:59:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(portal_date(early_utc), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
