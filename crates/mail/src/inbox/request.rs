//! View requests and the stale-response guard

use std::fmt;

use crate::api::PageCursor;
use crate::models::AccountScope;

/// Identifier of one view request, unique per coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a request populates the list with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    /// One server page of the inbox
    Paginated { page: u32 },
    /// A bounded aggregation pass filtered by `query`
    Search { query: String },
}

impl RequestMode {
    pub fn view_mode(&self) -> ViewMode {
        match self {
            Self::Paginated { .. } => ViewMode::Paginated,
            Self::Search { .. } => ViewMode::Search,
        }
    }
}

/// Presentation mode of the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Paginated,
    Search,
}

/// An intent to (re)populate the visible list
///
/// Scope and cursor are captured when the request is created and never
/// re-read from the coordinator afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub id: RequestId,
    pub scope: AccountScope,
    pub cursor: PageCursor,
    pub mode: RequestMode,
}

/// Issues request ids and remembers which one is still allowed to land
#[derive(Debug, Default)]
pub struct RequestGuard {
    counter: u64,
    last_valid: u64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and make it the only valid one
    pub fn issue(&mut self) -> RequestId {
        self.counter += 1;
        self.last_valid = self.counter;
        RequestId(self.counter)
    }

    /// Whether `id` is the most recently issued request
    pub fn is_latest(&self, id: RequestId) -> bool {
        self.last_valid != 0 && id.0 == self.last_valid
    }

    /// Reject everything issued so far
    pub fn invalidate(&mut self) {
        self.last_valid = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_increasing() {
        let mut guard = RequestGuard::new();
        let a = guard.issue();
        let b = guard.issue();
        let c = guard.issue();
        assert!(a < b && b < c);
        assert!(guard.is_latest(c));
    }

    #[test]
    fn test_only_latest_is_valid() {
        let mut guard = RequestGuard::new();
        let a = guard.issue();
        assert!(guard.is_latest(a));

        let b = guard.issue();
        assert!(!guard.is_latest(a));
        assert!(guard.is_latest(b));
    }

    #[test]
    fn test_invalidate() {
        let mut guard = RequestGuard::new();
        let a = guard.issue();
        guard.invalidate();
        assert!(!guard.is_latest(a));

        // Issuing again re-arms the guard without reusing ids
        let b = guard.issue();
        assert!(b > a);
        assert!(guard.is_latest(b));
    }

    #[test]
    fn test_fresh_guard_accepts_nothing() {
        let guard = RequestGuard::new();
        assert!(!guard.is_latest(RequestId(0)));
    }
}
