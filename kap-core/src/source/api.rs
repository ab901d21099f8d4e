use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{get_text, portal_today, normalize_time, AnnouncementSource};
use crate::announcement::Announcement;
use crate::error::SourceError;

pub const DEFAULT_API_URL: &str = "https://www.kap.org.tr/tr/api/disclosures";
const DISCLOSURE_LINK_BASE: &str = "https://www.kap.org.tr/tr/Bildirim";

/// Reads disclosures from the portal's JSON endpoint.
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: Client,
    url: String,
}

impl ApiSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, DEFAULT_API_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AnnouncementSource for ApiSource {
    async fn fetch(&self) -> Result<Vec<Announcement>, SourceError> {
        let body = get_text(&self.client, &self.url).await?;
        parse_disclosures(&body, portal_today())
    }

    fn name(&self) -> &'static str {
        "kap-api"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Disclosure {
    #[serde(alias = "companyName")]
    company_title: Option<String>,
    #[serde(alias = "title", alias = "subject")]
    disclosure_title: Option<String>,
    #[serde(alias = "publishedAt", alias = "time")]
    publish_date: Option<String>,
    summary: Option<String>,
    #[serde(alias = "disclosureId", alias = "id")]
    disclosure_index: Option<Value>,
}

/// Decodes the top-level array, then each element on its own so one bad
/// record cannot sink the batch.
pub fn parse_disclosures(body: &str, today: NaiveDate) -> Result<Vec<Announcement>, SourceError> {
    let records: Vec<Value> = serde_json::from_str(body)?;

    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let record = match record {
            Value::Object(mut map) if map.get("basic").is_some_and(Value::is_object) => {
                map.remove("basic").unwrap_or(Value::Null)
            }
            other => other,
        };

        let disclosure = match serde_json::from_value::<Disclosure>(record) {
            Ok(d) => d,
            Err(e) => {
                warn!(record = index, error = %e, "skipping undecodable disclosure");
                continue;
            }
        };

        match to_announcement(disclosure, today) {
            Some(announcement) => out.push(announcement),
            None => warn!(record = index, "skipping disclosure with missing fields"),
        }
    }
    Ok(out)
}

fn to_announcement(d: Disclosure, today: NaiveDate) -> Option<Announcement> {
    let link = d.disclosure_index.as_ref().and_then(|id| match id {
        Value::String(s) if !s.trim().is_empty() => Some(format!("{DISCLOSURE_LINK_BASE}/{}", s.trim())),
        Value::Number(n) => Some(format!("{DISCLOSURE_LINK_BASE}/{n}")),
        _ => None,
    });
    let time = d.publish_date.as_deref().map(|t| normalize_time(t, today));

    Announcement::from_parts(
        time.as_deref(),
        d.company_title.as_deref(),
        d.disclosure_title.as_deref(),
        d.summary.as_deref(),
        link.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn decodes_flat_and_wrapped_records() {
        let body = r#"[
            {"companyTitle": "ABC", "disclosureTitle": "Board Decision",
             "publishDate": "2024-01-01 10:00", "disclosureIndex": 1234},
            {"basic": {"companyName": "XYZ", "title": "Material Event",
             "publishDate": "Bugün 09:00", "summary": "Contract", "disclosureId": "77"}}
        ]"#;
        let items = parse_disclosures(body, today()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key(), "ABC-Board Decision-2024-01-01 10:00");
        assert_eq!(
            items[0].link.as_deref(),
            Some("https://www.kap.org.tr/tr/Bildirim/1234")
        );
        assert_eq!(items[1].time, "2024-01-01 09:00");
        assert_eq!(items[1].summary, "Contract");
    }

    #[test]
    fn bad_elements_are_skipped() {
        let body = r#"[
            {"companyTitle": "ABC", "disclosureTitle": "S", "publishDate": "t"},
            {"companyTitle": 42, "disclosureTitle": "S", "publishDate": "t"},
            {"disclosureTitle": "S", "publishDate": "t"},
            "garbage"
        ]"#;
        let items = parse_disclosures(body, today()).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn non_array_body_is_an_error() {
        assert!(matches!(
            parse_disclosures("{\"error\": true}", today()),
            Err(SourceError::Json(_))
        ));
    }
}
