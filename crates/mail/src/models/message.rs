//! Message summary model shown in the inbox list

use super::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (provider message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One row of the inbox list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Provider message ID
    pub id: MessageId,
    /// Subject line
    pub subject: String,
    /// Raw sender header (e.g. "Jane <jane@example.com>")
    pub sender: String,
    /// Plain text preview of the body
    pub preview: String,
    /// When the message was received, if the backend date parsed
    pub date: Option<DateTime<Utc>>,
    /// Whether the message has been read
    pub read: bool,
    /// Whether the message is starred/flagged
    pub starred: bool,
    /// Owning account, when the backend reports it
    pub account_id: Option<AccountId>,
}

impl MessageSummary {
    /// Create a new message summary builder
    pub fn builder(id: impl Into<MessageId>) -> MessageSummaryBuilder {
        MessageSummaryBuilder::new(id.into())
    }

    /// Case-insensitive substring match against subject, sender and preview.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.subject.to_lowercase().contains(needle)
            || self.sender.to_lowercase().contains(needle)
            || self.preview.to_lowercase().contains(needle)
    }
}

/// Builder for creating MessageSummary instances
pub struct MessageSummaryBuilder {
    id: MessageId,
    subject: String,
    sender: String,
    preview: String,
    date: Option<DateTime<Utc>>,
    read: bool,
    starred: bool,
    account_id: Option<AccountId>,
}

impl MessageSummaryBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            subject: String::new(),
            sender: String::new(),
            preview: String::new(),
            date: None,
            read: false,
            starred: false,
            account_id: None,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn build(self) -> MessageSummary {
        MessageSummary {
            id: self.id,
            subject: self.subject,
            sender: self.sender,
            preview: self.preview,
            date: self.date,
            read: self.read,
            starred: self.starred,
            account_id: self.account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MessageSummary {
        MessageSummary::builder("m1")
            .subject("Quarterly Invoice")
            .sender("Billing <billing@acme.test>")
            .preview("Your statement is ready")
            .build()
    }

    #[test]
    fn test_matches_subject_case_insensitive() {
        assert!(sample().matches("invoice"));
    }

    #[test]
    fn test_matches_sender_and_preview() {
        let msg = sample();
        assert!(msg.matches("acme.test"));
        assert!(msg.matches("statement"));
    }

    #[test]
    fn test_no_match() {
        assert!(!sample().matches("receipt"));
    }

    #[test]
    fn test_builder_defaults() {
        let msg = MessageSummary::builder("m2").build();
        assert_eq!(msg.id.as_str(), "m2");
        assert!(!msg.read);
        assert!(msg.date.is_none());
        assert!(msg.account_id.is_none());
    }
}
