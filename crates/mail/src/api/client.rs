//! Unified backend HTTP client
//!
//! Provides the [`MailApi`] calls over the backend's REST endpoints.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use log::debug;
use std::sync::Arc;

use super::normalize::normalize_message;
use super::wire::{AccountsResponse, InboxResponse};
use super::{CredentialProvider, FetchError, MailApi, MessagePage, PageCursor};
use crate::models::{Account, AccountId, AccountScope, MessageId};

/// HTTP client for the unified mail backend
pub struct HttpMailApi {
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    agent: ureq::Agent,
}

impl HttpMailApi {
    /// Create a client for a backend root such as `http://localhost:8000`
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Build the inbox URL for a scope/cursor pair
    fn inbox_url(&self, scope: AccountScope, cursor: &PageCursor, page_size: usize) -> String {
        let mut url = format!(
            "{}/api/mail-accounts/inbox?pageSize={}",
            self.base_url, page_size
        );

        if let Some(id) = scope.account_id() {
            url.push_str(&format!("&account_id={}", id));
        }
        if let Some(token) = cursor.as_token() {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&token)));
        }

        url
    }

    fn bearer(&self) -> Result<String, FetchError> {
        self.credentials
            .bearer_token()
            .map(|token| format!("Bearer {}", token))
            .ok_or(FetchError::Unauthorized)
    }
}

impl MailApi for HttpMailApi {
    fn fetch_messages(
        &self,
        scope: AccountScope,
        cursor: &PageCursor,
        page_size: usize,
    ) -> Result<MessagePage, FetchError> {
        let auth = self.bearer()?;
        let url = self.inbox_url(scope, cursor, page_size);
        debug!("GET inbox scope={} cursor={}", scope, cursor);

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &auth)
            .call()
            .map_err(map_ureq_error)?;

        let body: InboxResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(MessagePage {
            items: body
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(normalize_message)
                .collect(),
            next_token: body.next_page_token.filter(|t| !t.is_empty()),
            total_count: body.total_count,
        })
    }

    fn list_accounts(&self) -> Result<Vec<Account>, FetchError> {
        let auth = self.bearer()?;
        let url = format!("{}/api/mail-accounts/user", self.base_url);

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &auth)
            .call()
            .map_err(map_ureq_error)?;

        let body: AccountsResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(body.accounts)
    }

    fn delete_message(
        &self,
        account_id: AccountId,
        message_id: &MessageId,
    ) -> Result<(), FetchError> {
        let auth = self.bearer()?;
        let url = format!(
            "{}/api/emails/{}/{}",
            self.base_url,
            account_id,
            urlencoding::encode(message_id.as_str())
        );
        debug!("DELETE message {} (account {})", message_id.as_str(), account_id);

        self.agent
            .delete(&url)
            .header("Authorization", &auth)
            .call()
            .map_err(map_ureq_error)?;

        Ok(())
    }
}

/// Classify a ureq failure for the inbox error taxonomy
fn map_ureq_error(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(401) | ureq::Error::StatusCode(403) => FetchError::Unauthorized,
        ureq::Error::StatusCode(code) => FetchError::Status(code),
        other => FetchError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticCredentials;

    fn client() -> HttpMailApi {
        HttpMailApi::new(
            "http://localhost:8000/",
            Arc::new(StaticCredentials::new("tok")),
        )
    }

    #[test]
    fn test_inbox_url_all_accounts_first_page() {
        let url = client().inbox_url(AccountScope::All, &PageCursor::Start, 10);
        assert_eq!(url, "http://localhost:8000/api/mail-accounts/inbox?pageSize=10");
    }

    #[test]
    fn test_inbox_url_position_hint() {
        let url = client().inbox_url(AccountScope::All, &PageCursor::Position(3), 10);
        assert!(url.ends_with("pageSize=10&pageToken=3"));
    }

    #[test]
    fn test_inbox_url_account_token_is_encoded() {
        let url = client().inbox_url(
            AccountScope::Account(AccountId(5)),
            &PageCursor::Token("a+b/c=".to_string()),
            10,
        );
        assert!(url.contains("&account_id=5"));
        assert!(url.ends_with("&pageToken=a%2Bb%2Fc%3D"));
    }

    #[test]
    fn test_missing_credentials_is_unauthorized() {
        let api = HttpMailApi::new("http://localhost:8000", Arc::new(StaticCredentials::signed_out()));
        let err = api
            .fetch_messages(AccountScope::All, &PageCursor::Start, 10)
            .unwrap_err();
        assert_eq!(err, FetchError::Unauthorized);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_ureq_error(ureq::Error::StatusCode(401)), FetchError::Unauthorized);
        assert_eq!(map_ureq_error(ureq::Error::StatusCode(500)), FetchError::Status(500));
    }
}
