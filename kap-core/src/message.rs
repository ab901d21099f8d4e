//! Telegram HTML rendering of a disclosure.

use crate::announcement::Announcement;
use crate::price::Price;

const UNKNOWN: &str = "Bilinmiyor";

/// Escapes the three characters Telegram's HTML parse mode reserves.
/// Blank input renders as "Bilinmiyor".
pub fn escape_html(text: &str) -> String {
    if text.trim().is_empty() {
        return UNKNOWN.to_owned();
    }
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

/// Telegram refuses longer message texts outright.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const ELLIPSIS: char = '…';

/// Renders the notification. The summary is clipped so the whole text stays
/// within [`MAX_MESSAGE_CHARS`]; other fields are never cut.
pub fn format_message(announcement: &Announcement, price: &Price) -> String {
    let head = format!(
        "<b>📢 Yeni KAP Duyurusu 📢</b>\n\n\
         <b>📅 Tarih:</b> {}\n\
         <b>🏢 Şirket:</b> {} ({})\n\
         <b>📝 Konu:</b> {}\n\
         <b>📄 Özet:</b> ",
        escape_html(&announcement.time),
        escape_html(&announcement.company),
        escape_html(&price.to_string()),
        escape_html(&announcement.subject),
    );
    let tail = match &announcement.link {
        Some(link) => format!(
            "\n\n<a href=\"{}\">Bildirimi görüntüle</a>",
            escape_attr(link)
        ),
        None => String::new(),
    };

    let budget = MAX_MESSAGE_CHARS.saturating_sub(head.chars().count() + tail.chars().count());
    let summary = escape_clipped(&announcement.summary, budget);

    format!("{head}{summary}{tail}")
}

/// Escapes `text`, cutting it with an ellipsis if the escaped form would
/// exceed `budget` chars. Never splits an entity.
fn escape_clipped(text: &str, budget: usize) -> String {
    let full = escape_html(text);
    if full.chars().count() <= budget {
        return full;
    }

    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece: &str = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            _ => c.encode_utf8(&mut buf),
        };
        let width = piece.chars().count();
        if used + width + 1 > budget {
            break;
        }
        out.push_str(piece);
        used += width;
    }
    let keep = out.trim_end().len();
    out.truncate(keep);
    if budget > 0 {
        out.push(ELLIPSIS);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_html("A&B <Holding>"), "A&amp;B &lt;Holding&gt;");
        assert_eq!(escape_html("  "), "Bilinmiyor");
    }

    #[test]
    fn message_contains_fields_and_price() {
        let a = Announcement::new("2024-01-01 10:00", "ABC", "Board Decision");
        let msg = format_message(&a, &Price::Quoted("12.34 TL".into()));
        assert!(msg.contains("ABC (12.34 TL)"));
        assert!(msg.contains("Board Decision"));
        assert!(msg.contains("2024-01-01 10:00"));
        assert!(msg.contains("Özet Yok"));
        assert!(!msg.contains("<a href"));
    }

    #[test]
    fn message_renders_link_and_unavailable_price() {
        let a = Announcement::new("t", "X&Y", "S").with_link("https://kap.org.tr/tr/Bildirim/1");
        let msg = format_message(&a, &Price::Unavailable);
        assert!(msg.contains("X&amp;Y (Fiyat alınamadı)"));
        assert!(msg.contains(r#"<a href="https://kap.org.tr/tr/Bildirim/1">"#));
    }

    #[test]
    fn long_summary_is_clipped_to_telegram_limit() {
        let a = Announcement::new("2024-01-01 10:00", "ABC", "Board Decision")
            .with_summary("ş".repeat(5000))
            .with_link("https://www.kap.org.tr/tr/Bildirim/1");
        let msg = format_message(&a, &Price::Quoted("12.34 TL".into()));
        assert!(msg.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(msg.contains("şş…\n\n<a href="));
        assert!(msg.ends_with("Bildirimi görüntüle</a>"));
    }

    #[test]
    fn clipping_never_splits_an_entity() {
        let a = Announcement::new("t", "ABC", "S").with_summary("a&b<".repeat(2000));
        let msg = format_message(&a, &Price::Unavailable);
        assert!(msg.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(msg.ends_with('…'));
        let stripped = msg
            .replace("&amp;", "")
            .replace("&lt;", "")
            .replace("&gt;", "");
        assert!(!stripped.contains('&'));
    }

    #[test]
    fn short_summary_is_untouched() {
        let a = Announcement::new("t", "ABC", "S").with_summary("Temettü");
        let msg = format_message(&a, &Price::Unavailable);
        assert!(msg.ends_with("<b>📄 Özet:</b> Temettü"));
    }
}
