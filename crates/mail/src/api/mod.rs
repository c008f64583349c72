//! Mail-data REST API integration
//!
//! This module provides:
//! - The [`MailApi`] boundary the inbox coordinator fetches through
//! - An HTTP implementation of it over the unified backend
//! - Credential providers supplying the bearer token
//! - Response normalization to domain models

mod client;
mod credentials;
mod normalize;

pub use client::HttpMailApi;
pub use credentials::{CredentialProvider, SessionFile, StaticCredentials};
pub use normalize::{normalize_message, parse_message_date};

use std::fmt;

use crate::models::{Account, AccountId, AccountScope, MessageId, MessageSummary};

/// Where in the mailbox a page fetch should start
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageCursor {
    /// First page, no token
    #[default]
    Start,
    /// Opaque continuation token returned by the previous page
    Token(String),
    /// Coarse page-number hint, used when no token applies
    Position(u32),
}

impl PageCursor {
    /// The `pageToken` value sent to the backend, if any
    pub fn as_token(&self) -> Option<String> {
        match self {
            Self::Start => None,
            Self::Token(token) => Some(token.clone()),
            Self::Position(page) => Some(page.to_string()),
        }
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Token(_) => write!(f, "token"),
            Self::Position(page) => write!(f, "page {}", page),
        }
    }
}

/// One page of inbox messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub items: Vec<MessageSummary>,
    /// Token for the next page (None when no further pages)
    pub next_token: Option<String>,
    /// Total messages in the scope, when the backend reports it
    pub total_count: Option<usize>,
}

/// Failure of a call across the mail-data boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Superseded or unmounted; never user-facing
    #[error("request cancelled")]
    Cancelled,
    /// Credential missing or rejected; the session must be re-established
    #[error("not authenticated")]
    Unauthorized,
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// The mail-data backend as seen by the inbox
///
/// Calls are synchronous so implementations stay executor-agnostic;
/// the inbox runtime moves them onto blocking threads.
pub trait MailApi: Send + Sync {
    /// Fetch one page of inbox messages for a scope
    fn fetch_messages(
        &self,
        scope: AccountScope,
        cursor: &PageCursor,
        page_size: usize,
    ) -> Result<MessagePage, FetchError>;

    /// List the accounts connected by the signed-in user
    fn list_accounts(&self) -> Result<Vec<Account>, FetchError>;

    /// Move a message to the provider's trash
    fn delete_message(&self, account_id: AccountId, message_id: &MessageId)
    -> Result<(), FetchError>;
}

/// Wire types of the unified backend
pub mod wire {
    use serde::Deserialize;

    /// Response from `GET /api/mail-accounts/inbox`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InboxResponse {
        pub messages: Option<Vec<InboxMessage>>,
        pub next_page_token: Option<String>,
        pub total_count: Option<usize>,
    }

    /// A message row as the backend serializes it
    #[derive(Debug, Deserialize)]
    pub struct InboxMessage {
        pub id: String,
        #[serde(default)]
        pub subject: Option<String>,
        #[serde(default)]
        pub sender: Option<String>,
        #[serde(default)]
        pub preview: Option<String>,
        #[serde(default)]
        pub date: Option<String>,
        #[serde(default)]
        pub read: bool,
        #[serde(default)]
        pub starred: bool,
        pub account_id: Option<i64>,
    }

    /// Response from `GET /api/mail-accounts/user`
    #[derive(Debug, Deserialize)]
    pub struct AccountsResponse {
        #[serde(default)]
        pub accounts: Vec<crate::models::Account>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_tokens() {
        assert_eq!(PageCursor::Start.as_token(), None);
        assert_eq!(
            PageCursor::Token("abc".to_string()).as_token(),
            Some("abc".to_string())
        );
        assert_eq!(PageCursor::Position(3).as_token(), Some("3".to_string()));
    }

    #[test]
    fn test_parse_inbox_response() {
        let json = r#"{
            "messages": [
                {"id": "18c2", "subject": "Hi", "sender": "a@b.c", "preview": "hello",
                 "date": "2024-03-01T10:00:00Z", "read": false, "starred": true, "account_id": 2}
            ],
            "nextPageToken": "tok-2",
            "totalCount": 25
        }"#;

        let resp: wire::InboxResponse = serde_json::from_str(json).unwrap();
        let messages = resp.messages.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].account_id, Some(2));
        assert_eq!(resp.next_page_token.as_deref(), Some("tok-2"));
        assert_eq!(resp.total_count, Some(25));
    }

    #[test]
    fn test_parse_sparse_inbox_response() {
        let resp: wire::InboxResponse = serde_json::from_str(r#"{"messages": null}"#).unwrap();
        assert!(resp.messages.is_none());
        assert!(resp.next_page_token.is_none());
    }
}
