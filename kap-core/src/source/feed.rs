use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use tracing::warn;

use super::{get_text, normalize_time, portal_offset, portal_today, AnnouncementSource};
use crate::announcement::Announcement;
use crate::error::SourceError;

pub const DEFAULT_RSS_URL: &str = "https://www.kap.org.tr/tr/rss/bildirimler";

/// Reads disclosures from an RSS 2.0 feed.
#[derive(Debug, Clone)]
pub struct RssSource {
    client: Client,
    url: String,
}

impl RssSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, DEFAULT_RSS_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AnnouncementSource for RssSource {
    async fn fetch(&self) -> Result<Vec<Announcement>, SourceError> {
        let body = get_text(&self.client, &self.url).await?;
        parse_feed(&body, portal_today())
    }

    fn name(&self) -> &'static str {
        "kap-rss"
    }
}

pub fn parse_feed(body: &str, today: NaiveDate) -> Result<Vec<Announcement>, SourceError> {
    let channel = ::rss::Channel::read_from(body.as_bytes())?;

    let mut out = Vec::with_capacity(channel.items().len());
    for (index, item) in channel.items().iter().enumerate() {
        match from_rss_item(item, today) {
            Some(announcement) => out.push(announcement),
            None => warn!(item = index, title = ?item.title(), "skipping feed item with missing fields"),
        }
    }
    Ok(out)
}

fn from_rss_item(item: &::rss::Item, today: NaiveDate) -> Option<Announcement> {
    let title = item.title().unwrap_or_default().trim();

    // Company from author / Dublin Core creator / first category, else a
    // "COMPANY - subject" title.
    let explicit_company = item
        .author()
        .map(ToOwned::to_owned)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned())
        })
        .or_else(|| item.categories().first().map(|c| c.name().to_owned()))
        .filter(|c| !c.trim().is_empty());

    let (company, subject) = match explicit_company {
        Some(company) => (Some(company), title.to_owned()),
        None => match title.split_once(" - ") {
            Some((company, subject)) => (Some(company.to_owned()), subject.to_owned()),
            None => (None, title.to_owned()),
        },
    };

    let time = item.pub_date().map(|raw| feed_time(raw, today));

    Announcement::from_parts(
        time.as_deref(),
        company.as_deref(),
        Some(subject.as_str()),
        item.description(),
        item.link(),
    )
}

/// RFC 2822 dates are rendered as `YYYY-MM-DD HH:MM` in portal time, matching
/// the listing page whatever zone the host runs in; anything else is kept
/// verbatim.
fn feed_time(raw: &str, today: NaiveDate) -> String {
    match DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(dt) => dt
            .with_timezone(&portal_offset())
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => normalize_time(raw, today),
    }
}
