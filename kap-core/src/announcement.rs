use serde::{Deserialize, Serialize};

/// Placeholder used when a disclosure carries no summary text.
pub const NO_SUMMARY: &str = "Özet Yok";

/// One disclosure as reported by the upstream source.
///
/// `time` is kept exactly as the source printed it; it is not converted to a
/// canonical timezone because it takes part in [`Announcement::key`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    pub time: String,
    pub company: String,
    pub subject: String,
    pub summary: String,
    pub link: Option<String>,
}

impl Announcement {
    pub fn new(
        time: impl Into<String>,
        company: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            company: company.into(),
            subject: subject.into(),
            summary: NO_SUMMARY.to_owned(),
            link: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        let trimmed = summary.trim();
        if !trimmed.is_empty() {
            self.summary = trimmed.to_owned();
        }
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        let trimmed = link.trim();
        self.link = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Builds an announcement out of optionally-present source fields.
    ///
    /// Returns `None` when time, company or subject is missing or blank, so
    /// adapters can drop a broken record without failing the whole batch.
    pub fn from_parts(
        time: Option<&str>,
        company: Option<&str>,
        subject: Option<&str>,
        summary: Option<&str>,
        link: Option<&str>,
    ) -> Option<Self> {
        let time = non_blank(time)?;
        let company = non_blank(company)?;
        let subject = non_blank(subject)?;

        let mut announcement = Self::new(time, company, subject);
        if let Some(summary) = summary {
            announcement = announcement.with_summary(summary);
        }
        if let Some(link) = link {
            announcement = announcement.with_link(link);
        }
        Some(announcement)
    }

    /// Dedup identity: company, subject and time joined with `-`.
    ///
    /// Character-exact on purpose: no case, whitespace or punctuation folding.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.company, self.subject, self.time)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_company_subject_time() {
        let a = Announcement::new("2024-01-01 10:00", "ABC", "Board Decision");
        assert_eq!(a.key(), "ABC-Board Decision-2024-01-01 10:00");
    }

    #[test]
    fn key_is_not_normalized() {
        let a = Announcement::new("2024-01-01 10:00", "ABC", "Board Decision");
        let b = Announcement::new("2024-01-01 10:00", "abc", "Board  Decision");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn from_parts_rejects_missing_identity_fields() {
        assert!(Announcement::from_parts(None, Some("ABC"), Some("S"), None, None).is_none());
        assert!(Announcement::from_parts(Some("t"), Some("   "), Some("S"), None, None).is_none());
        assert!(Announcement::from_parts(Some("t"), Some("ABC"), None, None, None).is_none());
    }

    #[test]
    fn from_parts_defaults_summary_and_trims() {
        let a = Announcement::from_parts(
            Some(" 2024-01-01 10:00 "),
            Some(" ABC "),
            Some("Board Decision\n"),
            Some("  "),
            Some(""),
        )
        .expect("valid record");
        assert_eq!(a.time, "2024-01-01 10:00");
        assert_eq!(a.company, "ABC");
        assert_eq!(a.subject, "Board Decision");
        assert_eq!(a.summary, NO_SUMMARY);
        assert_eq!(a.link, None);
    }
}
