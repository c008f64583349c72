//! Unified inbox view coordination
//!
//! This module provides:
//! - [`InboxCoordinator`]: the synchronous state machine deciding which
//!   fetch results may update the visible list
//! - [`InboxRuntime`] / [`InboxHandle`]: a tokio driver executing the
//!   coordinator's effects (fetches, cancellation, debounce timers)
//! - Pagination and client-side search helpers

mod coordinator;
mod fetch;
mod pagination;
mod request;
mod runtime;
mod search;
mod state;

pub use coordinator::{DeletionReport, Effect, FetchOutcome, InboxCoordinator, Notification};
pub use fetch::{delete_batches, execute_request};
pub use pagination::{resolve_cursor, total_pages};
pub use request::{RequestGuard, RequestId, RequestMode, ViewMode, ViewRequest};
pub use runtime::{InboxClosed, InboxHandle, InboxRuntime, LogNotifier, Notifier, Trigger};
pub use search::{SearchLimits, aggregate_pages, filter_matches, is_searchable};
pub use state::{Phase, ViewError, ViewState};
