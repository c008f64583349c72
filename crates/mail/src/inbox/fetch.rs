//! Blocking execution of coordinator effects against a [`MailApi`]

use std::collections::BTreeMap;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::coordinator::{DeletionReport, FetchOutcome};
use super::request::{RequestMode, ViewRequest};
use super::search::{SearchLimits, aggregate_pages};
use crate::api::{FetchError, MailApi};
use crate::config::InboxSettings;
use crate::models::{AccountId, MessageId};

/// Run one view request to completion
///
/// A request cancelled while the transport was busy reports
/// [`FetchError::Cancelled`] even if the server answered.
pub fn execute_request(
    api: &dyn MailApi,
    request: &ViewRequest,
    settings: &InboxSettings,
    cancel: &CancellationToken,
) -> FetchOutcome {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let result = match &request.mode {
        RequestMode::Paginated { page } => {
            debug!(
                "Fetching page {} of {} ({}) for request {}",
                page, request.scope, request.cursor, request.id
            );
            api.fetch_messages(request.scope, &request.cursor, settings.page_size)
        }
        RequestMode::Search { .. } => {
            aggregate_pages(api, request.scope, SearchLimits::from(settings), cancel)
        }
    };

    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    result
}

/// Delete every message in `batches`, continuing past individual failures
pub fn delete_batches(
    api: &dyn MailApi,
    batches: &BTreeMap<AccountId, Vec<MessageId>>,
) -> DeletionReport {
    let mut report = DeletionReport::default();

    for (account_id, ids) in batches {
        for id in ids {
            match api.delete_message(*account_id, id) {
                Ok(()) => report.deleted.push(id.clone()),
                Err(FetchError::Unauthorized) => {
                    report.failed += 1;
                    report.unauthorized = true;
                }
                Err(e) => {
                    warn!("Failed to delete message {} of account {}: {}", id.as_str(), account_id, e);
                    report.failed += 1;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MessagePage, PageCursor};
    use crate::inbox::request::RequestId;
    use crate::models::{Account, AccountScope, MessageSummary};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        fetches: Mutex<Vec<(AccountScope, PageCursor, usize)>>,
        deletes: Mutex<Vec<(AccountId, MessageId)>>,
    }

    impl MailApi for RecordingApi {
        fn fetch_messages(
            &self,
            scope: AccountScope,
            cursor: &PageCursor,
            page_size: usize,
        ) -> Result<MessagePage, FetchError> {
            self.fetches.lock().unwrap().push((scope, cursor.clone(), page_size));
            Ok(MessagePage {
                items: vec![MessageSummary::builder("m1").build()],
                next_token: Some("next".to_string()),
                total_count: Some(40),
            })
        }

        fn list_accounts(&self) -> Result<Vec<Account>, FetchError> {
            Ok(Vec::new())
        }

        fn delete_message(&self, account_id: AccountId, message_id: &MessageId) -> Result<(), FetchError> {
            self.deletes.lock().unwrap().push((account_id, message_id.clone()));
            match message_id.as_str() {
                "expired" => Err(FetchError::Unauthorized),
                "missing" => Err(FetchError::Status(404)),
                _ => Ok(()),
            }
        }
    }

    fn request(mode: RequestMode, cursor: PageCursor) -> ViewRequest {
        ViewRequest {
            id: RequestId(7),
            scope: AccountScope::Account(AccountId(3)),
            cursor,
            mode,
        }
    }

    #[test]
    fn test_paginated_request_uses_page_size() {
        let api = RecordingApi::default();
        let settings = InboxSettings::default();
        let req = request(RequestMode::Paginated { page: 2 }, PageCursor::Token("t".into()));

        let page = execute_request(&api, &req, &settings, &CancellationToken::new()).unwrap();

        assert_eq!(page.total_count, Some(40));
        assert_eq!(
            api.fetches.lock().unwrap().as_slice(),
            &[(AccountScope::Account(AccountId(3)), PageCursor::Token("t".into()), 10)]
        );
    }

    #[test]
    fn test_search_request_aggregates() {
        let api = RecordingApi::default();
        let settings = InboxSettings::default();
        let req = request(
            RequestMode::Search {
                query: "invoice".into(),
            },
            PageCursor::Start,
        );

        let page = execute_request(&api, &req, &settings, &CancellationToken::new()).unwrap();

        // Two pages of one item each, tokens dropped
        assert_eq!(page.items.len(), 2);
        assert!(page.next_token.is_none());
        let fetches = api.fetches.lock().unwrap();
        assert_eq!(fetches.len(), 2);
        assert!(fetches.iter().all(|(_, _, size)| *size == 100));
    }

    #[test]
    fn test_cancelled_request_never_calls_api() {
        let api = RecordingApi::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let req = request(RequestMode::Paginated { page: 1 }, PageCursor::Start);

        let outcome = execute_request(&api, &req, &InboxSettings::default(), &cancel);

        assert_eq!(outcome, Err(FetchError::Cancelled));
        assert!(api.fetches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_batches_reports_each_outcome() {
        let api = RecordingApi::default();
        let mut batches = BTreeMap::new();
        batches.insert(AccountId(1), vec![MessageId::new("a"), MessageId::new("missing")]);
        batches.insert(AccountId(2), vec![MessageId::new("expired"), MessageId::new("b")]);

        let report = delete_batches(&api, &batches);

        assert_eq!(report.deleted, vec![MessageId::new("a"), MessageId::new("b")]);
        assert_eq!(report.failed, 2);
        assert!(report.unauthorized);
        assert_eq!(api.deletes.lock().unwrap().len(), 4);
    }
}
