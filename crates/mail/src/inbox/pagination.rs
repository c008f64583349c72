//! Page arithmetic and continuation-token resolution

use crate::api::PageCursor;
use crate::models::AccountScope;

/// Number of pages for `total_count` messages, never less than one
pub fn total_pages(total_count: usize, page_size: usize) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total_count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Pick the cursor for loading `target`.
///
/// A per-account continuation token is only reusable for the page right
/// after the loaded one. Every other move (jumps, backwards, or the
/// aggregate scope whose backend paging has no tokens) falls back to the
/// page number as a positional hint. That hint is approximate: mail
/// arriving mid-pagination shifts the offsets.
pub fn resolve_cursor(
    scope: AccountScope,
    loaded_page: u32,
    next_token: Option<&str>,
    target: u32,
) -> PageCursor {
    if target <= 1 {
        return PageCursor::Start;
    }

    match (scope, next_token) {
        (AccountScope::Account(_), Some(token)) if target == loaded_page + 1 => {
            PageCursor::Token(token.to_string())
        }
        _ => PageCursor::Position(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountId;

    const ACCOUNT: AccountScope = AccountScope::Account(AccountId(1));

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(5, 0), 1);
    }

    #[test]
    fn test_first_page_never_uses_token() {
        assert_eq!(resolve_cursor(ACCOUNT, 2, Some("tok"), 1), PageCursor::Start);
        assert_eq!(resolve_cursor(AccountScope::All, 3, None, 1), PageCursor::Start);
    }

    #[test]
    fn test_next_page_reuses_token_for_account() {
        assert_eq!(
            resolve_cursor(ACCOUNT, 1, Some("tok"), 2),
            PageCursor::Token("tok".to_string())
        );
    }

    #[test]
    fn test_jump_falls_back_to_position() {
        assert_eq!(resolve_cursor(ACCOUNT, 1, Some("tok"), 3), PageCursor::Position(3));
        assert_eq!(resolve_cursor(ACCOUNT, 3, Some("tok"), 2), PageCursor::Position(2));
    }

    #[test]
    fn test_missing_token_falls_back_to_position() {
        assert_eq!(resolve_cursor(ACCOUNT, 1, None, 2), PageCursor::Position(2));
    }

    #[test]
    fn test_all_scope_uses_position() {
        assert_eq!(
            resolve_cursor(AccountScope::All, 1, Some("tok"), 2),
            PageCursor::Position(2)
        );
    }
}
