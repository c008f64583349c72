//! Externally visible inbox state

use std::fmt;

use super::request::ViewMode;
use crate::models::{AccountScope, MessageId, MessageSummary};

/// Lifecycle phase of the visible list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Failure attached to the visible list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The credential was rejected; handled by the session layer
    SessionExpired,
    /// Network or server failure, retryable with refresh
    Fetch(String),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionExpired => write!(f, "session expired, sign in again"),
            Self::Fetch(msg) => write!(f, "could not load messages: {}", msg),
        }
    }
}

/// Snapshot of the inbox list as the UI renders it
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub scope: AccountScope,
    pub mode: ViewMode,
    pub phase: Phase,
    pub items: Vec<MessageSummary>,
    /// Pagination metadata; meaningful in paginated mode only
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: usize,
    pub is_loading: bool,
    pub last_error: Option<ViewError>,
    /// Raw search box contents, updated on every keystroke
    pub search_input: String,
}

impl ViewState {
    pub fn new(scope: AccountScope) -> Self {
        Self {
            scope,
            mode: ViewMode::Paginated,
            phase: Phase::Idle,
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total_count: 0,
            is_loading: false,
            last_error: None,
            search_input: String::new(),
        }
    }

    /// Loaded successfully with nothing to show
    pub fn is_empty_result(&self) -> bool {
        self.phase == Phase::Loaded && self.items.is_empty()
    }

    pub fn find(&self, id: &MessageId) -> Option<&MessageSummary> {
        self.items.iter().find(|m| &m.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|m| !m.read).count()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(AccountScope::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = ViewState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 1);
        assert!(!state.is_empty_result());
    }

    #[test]
    fn test_empty_result_requires_loaded() {
        let mut state = ViewState::default();
        state.phase = Phase::Loaded;
        assert!(state.is_empty_result());

        state.phase = Phase::Error;
        assert!(!state.is_empty_result());
    }

    #[test]
    fn test_unread_count() {
        let mut state = ViewState::default();
        state.items = vec![
            MessageSummary::builder("a").read(true).build(),
            MessageSummary::builder("b").build(),
        ];
        assert_eq!(state.unread_count(), 1);
        assert!(state.find(&MessageId::new("b")).is_some());
    }
}
