use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::{get_text, portal_today, normalize_time, AnnouncementSource};
use crate::announcement::Announcement;
use crate::error::SourceError;

pub const DEFAULT_HTML_URL: &str = "https://www.kap.org.tr/tr/bildirim-sorgu";

/// Scrapes the KAP disclosure listing page.
#[derive(Debug, Clone)]
pub struct HtmlSource {
    client: Client,
    url: String,
}

impl HtmlSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, DEFAULT_HTML_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AnnouncementSource for HtmlSource {
    async fn fetch(&self) -> Result<Vec<Announcement>, SourceError> {
        let body = get_text(&self.client, &self.url).await?;
        parse_listing(&body, &self.url, portal_today())
    }

    fn name(&self) -> &'static str {
        "kap-html"
    }
}

struct RowSelectors {
    row: Selector,
    time: Selector,
    company: Selector,
    subject: Selector,
    summary: Selector,
    link: Selector,
}

impl RowSelectors {
    fn new() -> Result<Self, SourceError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector `{css}`: {e:?}")))
        };
        Ok(Self {
            row: parse(".notification-row")?,
            time: parse(".time")?,
            company: parse(".company-title")?,
            subject: parse(".notification-subject")?,
            summary: parse(".notification-summary")?,
            link: parse("a[href]")?,
        })
    }
}

/// Parses the listing page. Rows missing time, company or subject are
/// skipped with a warning.
pub fn parse_listing(
    body: &str,
    page_url: &str,
    today: NaiveDate,
) -> Result<Vec<Announcement>, SourceError> {
    let selectors = RowSelectors::new()?;
    let document = Html::parse_document(body);
    let base = Url::parse(page_url).ok();

    let mut out = Vec::new();
    for (index, row) in document.select(&selectors.row).enumerate() {
        let time = text_of(row, &selectors.time).map(|t| normalize_time(&t, today));
        let company = text_of(row, &selectors.company);
        let subject = text_of(row, &selectors.subject);
        let summary = text_of(row, &selectors.summary);
        let link = row
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(base.as_ref(), href));

        match Announcement::from_parts(
            time.as_deref(),
            company.as_deref(),
            subject.as_deref(),
            summary.as_deref(),
            link.as_deref(),
        ) {
            Some(announcement) => out.push(announcement),
            None => warn!(row = index, "skipping disclosure row with missing fields"),
        }
    }

    debug!(count = out.len(), "parsed disclosure listing");
    Ok(out)
}

fn text_of(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Url::parse(href).ok().map(String::from),
    }
}
