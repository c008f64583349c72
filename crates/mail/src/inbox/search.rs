//! Client-side inbox search
//!
//! The backend has no search endpoint for the unified inbox, so a search
//! pulls a bounded window of recent mail and filters it locally.

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::api::{FetchError, MailApi, MessagePage, PageCursor};
use crate::config::InboxSettings;
use crate::models::{AccountScope, MessageSummary};

/// Bounds of one aggregation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Messages requested per server page
    pub page_size: usize,
    /// Server pages fetched at most
    pub max_pages: usize,
    /// Stop requesting pages once this many messages are collected
    pub max_items: usize,
}

impl From<&InboxSettings> for SearchLimits {
    fn from(settings: &InboxSettings) -> Self {
        Self {
            page_size: settings.search_page_size,
            max_pages: settings.search_max_pages,
            max_items: settings.search_max_items,
        }
    }
}

/// Whether `query` is long enough to be a real search
pub fn is_searchable(query: &str, min_len: usize) -> bool {
    let query = query.trim();
    !query.is_empty() && query.chars().count() >= min_len
}

/// Fetch up to `limits.max_pages` server pages for `scope`
///
/// Rows owned by another account are dropped before counting towards
/// `limits.max_items`. Cancellation is checked before every page; a cancelled pass returns
/// [`FetchError::Cancelled`] and discards what it collected.
pub fn aggregate_pages(
    api: &dyn MailApi,
    scope: AccountScope,
    limits: SearchLimits,
    cancel: &CancellationToken,
) -> Result<MessagePage, FetchError> {
    let mut items: Vec<MessageSummary> = Vec::new();
    let mut cursor = PageCursor::Start;
    let mut pages = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let page = api.fetch_messages(scope, &cursor, limits.page_size)?;
        pages += 1;
        match scope.account_id() {
            Some(account) => items.extend(
                page.items
                    .into_iter()
                    .filter(|m| m.account_id.is_none_or(|owner| owner == account)),
            ),
            None => items.extend(page.items),
        }

        if pages >= limits.max_pages || items.len() >= limits.max_items {
            break;
        }
        match page.next_token {
            Some(token) => cursor = PageCursor::Token(token),
            None => break,
        }
    }

    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    debug!("Search pass for {} aggregated {} messages over {} pages", scope, items.len(), pages);

    Ok(MessagePage {
        items,
        next_token: None,
        total_count: None,
    })
}

/// Keep messages whose subject, sender or preview contains `query`,
/// ignoring case
pub fn filter_matches(items: Vec<MessageSummary>, query: &str) -> Vec<MessageSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items;
    }
    items.into_iter().filter(|m| m.matches(&needle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, AccountId, MessageId};
    use std::sync::Mutex;

    /// Serves `pages` in order, one per call
    struct PagedApi {
        pages: Vec<MessagePage>,
        calls: Mutex<Vec<(PageCursor, usize)>>,
    }

    impl PagedApi {
        fn new(pages: Vec<MessagePage>) -> Self {
            Self {
                pages,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(PageCursor, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MailApi for PagedApi {
        fn fetch_messages(
            &self,
            _scope: AccountScope,
            cursor: &PageCursor,
            page_size: usize,
        ) -> Result<MessagePage, FetchError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push((cursor.clone(), page_size));
            self.pages.get(index).cloned().ok_or(FetchError::Status(500))
        }

        fn list_accounts(&self) -> Result<Vec<Account>, FetchError> {
            Ok(Vec::new())
        }

        fn delete_message(&self, _: AccountId, _: &MessageId) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn page(prefix: &str, n: usize, next: Option<&str>) -> MessagePage {
        MessagePage {
            items: (0..n)
                .map(|i| MessageSummary::builder(format!("{}{}", prefix, i)).build())
                .collect(),
            next_token: next.map(str::to_string),
            total_count: None,
        }
    }

    fn limits(max_pages: usize, max_items: usize) -> SearchLimits {
        SearchLimits {
            page_size: 100,
            max_pages,
            max_items,
        }
    }

    #[test]
    fn test_is_searchable() {
        assert!(!is_searchable("", 2));
        assert!(!is_searchable("   ", 2));
        assert!(!is_searchable("a", 2));
        assert!(!is_searchable(" a ", 2));
        assert!(is_searchable("ab", 2));
        // Counted in characters, not bytes
        assert!(!is_searchable("ö", 2));
        assert!(is_searchable("öü", 2));
    }

    #[test]
    fn test_aggregate_follows_tokens_up_to_page_cap() {
        let api = PagedApi::new(vec![
            page("a", 100, Some("t2")),
            page("b", 100, Some("t3")),
            page("c", 100, None),
        ]);

        let result =
            aggregate_pages(&api, AccountScope::All, limits(2, 1000), &CancellationToken::new())
                .unwrap();

        assert_eq!(result.items.len(), 200);
        assert_eq!(
            api.calls(),
            vec![
                (PageCursor::Start, 100),
                (PageCursor::Token("t2".to_string()), 100)
            ]
        );
    }

    #[test]
    fn test_aggregate_stops_at_item_cap() {
        let api = PagedApi::new(vec![page("a", 100, Some("t2")), page("b", 100, None)]);

        let result =
            aggregate_pages(&api, AccountScope::All, limits(5, 80), &CancellationToken::new())
                .unwrap();

        assert_eq!(result.items.len(), 100);
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_item_cap_counts_only_scoped_rows() {
        let mut first = page("a", 100, Some("t2"));
        for (i, message) in first.items.iter_mut().enumerate() {
            message.account_id = Some(AccountId(if i < 10 { 1 } else { 2 }));
        }
        let api = PagedApi::new(vec![first, page("b", 100, None)]);

        let result = aggregate_pages(
            &api,
            AccountScope::Account(AccountId(1)),
            limits(2, 80),
            &CancellationToken::new(),
        )
        .unwrap();

        // 10 owned rows from page one, then page two's unowned rows
        assert_eq!(result.items.len(), 110);
        assert_eq!(api.calls().len(), 2);
        assert!(result.items.iter().all(|m| m.account_id != Some(AccountId(2))));
    }

    #[test]
    fn test_aggregate_stops_without_token() {
        let api = PagedApi::new(vec![page("a", 30, None)]);

        let result =
            aggregate_pages(&api, AccountScope::All, limits(2, 150), &CancellationToken::new())
                .unwrap();

        assert_eq!(result.items.len(), 30);
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_aggregate_cancelled_before_start() {
        let api = PagedApi::new(vec![page("a", 10, None)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = aggregate_pages(&api, AccountScope::All, limits(2, 150), &cancel).unwrap_err();
        assert_eq!(err, FetchError::Cancelled);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_aggregate_propagates_failure() {
        let api = PagedApi::new(vec![page("a", 10, Some("t2"))]);

        let err =
            aggregate_pages(&api, AccountScope::All, limits(2, 150), &CancellationToken::new())
                .unwrap_err();
        assert_eq!(err, FetchError::Status(500));
    }

    #[test]
    fn test_filter_matches() {
        let items = vec![
            MessageSummary::builder("1").subject("Invoice #42").build(),
            MessageSummary::builder("2").sender("INVOICES <billing@x.io>").build(),
            MessageSummary::builder("3").preview("see attached invoice").build(),
            MessageSummary::builder("4").subject("Lunch?").build(),
        ];

        let ids: Vec<String> = filter_matches(items, "  InVoice ")
            .into_iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
