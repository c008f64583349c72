//! Backend response normalization
//!
//! Converts unified-backend rows to inbox domain models.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::wire::InboxMessage;
use crate::models::{AccountId, MessageSummary};

/// Normalize a backend inbox row to a MessageSummary
pub fn normalize_message(msg: InboxMessage) -> MessageSummary {
    let preview = msg.preview.as_deref().map(decode_html_entities).unwrap_or_default();
    let mut builder = MessageSummary::builder(msg.id)
        .subject(msg.subject.unwrap_or_default())
        .sender(msg.sender.unwrap_or_default())
        .preview(preview)
        .read(msg.read)
        .starred(msg.starred);

    if let Some(date) = msg.date.as_deref().and_then(parse_message_date) {
        builder = builder.date(date);
    }
    if let Some(id) = msg.account_id {
        builder = builder.account(AccountId(id));
    }

    builder.build()
}

/// Parse the date formats the backend emits.
///
/// Gmail rows carry RFC 2822 header dates, Outlook rows carry RFC 3339
/// `receivedDateTime`, and reformatted rows may be naive `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC).
pub fn parse_message_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Outlook omits the offset on some endpoints
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Decode the handful of HTML entities providers leave in previews
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
