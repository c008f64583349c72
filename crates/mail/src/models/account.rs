//! Account model representing a connected provider mailbox

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend identifier of a connected mail account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mail provider behind an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountKind {
    Gmail,
    Outlook,
    Other(String),
}

impl From<String> for AccountKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "gmail" => Self::Gmail,
            "outlook" => Self::Outlook,
            _ => Self::Other(s),
        }
    }
}

impl From<AccountKind> for String {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Gmail => "gmail".to_string(),
            AccountKind::Outlook => "outlook".to_string(),
            AccountKind::Other(s) => s,
        }
    }
}

/// A mail account connected by the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Backend primary key
    #[serde(rename = "account_id")]
    pub id: AccountId,
    /// Mailbox address
    pub email: String,
    /// Provider type
    #[serde(rename = "account_type")]
    pub kind: AccountKind,
    /// Unread messages reported by the backend
    #[serde(default)]
    pub unread_count: u32,
    /// When the backend last polled this mailbox, as reported
    #[serde(default)]
    pub last_checked: Option<String>,
}

impl Account {
    pub fn new(id: i64, email: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: AccountId(id),
            email: email.into(),
            kind,
            unread_count: 0,
            last_checked: None,
        }
    }
}

/// The account-selection context a view request is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccountScope {
    /// Aggregate view across every connected account
    #[default]
    All,
    /// A single account
    Account(AccountId),
}

impl AccountScope {
    /// The scoped account, if any
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::All => None,
            Self::Account(id) => Some(*id),
        }
    }
}

impl fmt::Display for AccountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Account(id) => write!(f, "{}", id),
        }
    }
}

/// Error returned when a scope string is neither `all` nor an account id
#[derive(Debug, thiserror::Error)]
#[error("invalid account scope: {0:?}")]
pub struct ParseScopeError(String);

impl FromStr for AccountScope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<i64>()
            .map(|id| Self::Account(AccountId(id)))
            .map_err(|_| ParseScopeError(s.to_string()))
    }
}
