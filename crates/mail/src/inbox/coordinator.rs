//! Inbox coordinator state machine
//!
//! The coordinator owns the visible [`ViewState`] and decides which fetch
//! results may touch it. It performs no I/O: every trigger returns the
//! [`Effect`]s the driver has to carry out, and every settled fetch is fed
//! back through [`InboxCoordinator::apply_outcome`].
//!
//! A result is applied only when its request id is the latest one issued
//! *and* its captured scope equals the live scope. The id check handles
//! out-of-order completion; the scope check handles toggling back to a
//! scope whose older request is still in flight.

use log::{debug, info, trace, warn};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use super::pagination::{resolve_cursor, total_pages};
use super::request::{RequestGuard, RequestId, RequestMode, ViewMode, ViewRequest};
use super::search::{filter_matches, is_searchable};
use super::state::{Phase, ViewError, ViewState};
use crate::api::{FetchError, MessagePage, PageCursor};
use crate::config::InboxSettings;
use crate::models::{AccountId, AccountScope, MessageId, MessageSummary};

/// Result of executing a [`ViewRequest`]
pub type FetchOutcome = Result<MessagePage, FetchError>;

/// User-facing notification (toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error(String),
}

/// Work the driver performs on behalf of the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Execute the request and report back with `apply_outcome`
    Fetch(ViewRequest),
    /// Abort the transport for a superseded request, if still running
    Cancel(RequestId),
    /// Call `debounce_elapsed(generation)` after `delay`
    ScheduleDebounce { generation: u64, delay: Duration },
    Notify(Notification),
    /// Hand the rejected credential to the session layer
    SessionExpired,
    /// Delete messages server side and report with `deletion_finished`
    Delete {
        batches: BTreeMap<AccountId, Vec<MessageId>>,
    },
}

/// Outcome of an [`Effect::Delete`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub deleted: Vec<MessageId>,
    pub failed: usize,
    /// At least one deletion was rejected for authentication
    pub unauthorized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Mounted,
    Unmounted,
}

/// Serializes overlapping fetches onto one coherent [`ViewState`]
pub struct InboxCoordinator {
    settings: InboxSettings,
    state: ViewState,
    guard: RequestGuard,
    /// Latest issued request, also the template for `refresh`
    current: Option<ViewRequest>,
    /// Request whose transport may still be running
    in_flight: Option<RequestId>,
    /// Continuation token returned with the loaded page
    next_token: Option<String>,
    debounce_generation: u64,
    lifecycle: Lifecycle,
}

impl InboxCoordinator {
    pub fn new(scope: AccountScope, settings: InboxSettings) -> Self {
        Self {
            settings,
            state: ViewState::new(scope),
            guard: RequestGuard::new(),
            current: None,
            in_flight: None,
            next_token: None,
            debounce_generation: 0,
            lifecycle: Lifecycle::Created,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn settings(&self) -> &InboxSettings {
        &self.settings
    }

    pub fn is_unmounted(&self) -> bool {
        self.lifecycle == Lifecycle::Unmounted
    }

    /// Initial load of page 1 for the current scope
    pub fn mount(&mut self) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Created {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Mounted;
        debug!("Inbox mounted with scope {}", self.state.scope);
        self.issue(RequestMode::Paginated { page: 1 }, PageCursor::Start)
    }

    /// Stop for good: cancel the outstanding request and ignore later events
    pub fn unmount(&mut self) -> Vec<Effect> {
        if self.lifecycle == Lifecycle::Unmounted {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Unmounted;
        self.guard.invalidate();
        self.debounce_generation += 1;
        self.state.is_loading = false;
        debug!("Inbox unmounted");
        self.in_flight.take().map(Effect::Cancel).into_iter().collect()
    }

    /// Show a different account (or all of them), starting at page 1
    pub fn switch_scope(&mut self, scope: AccountScope) -> Vec<Effect> {
        if self.is_unmounted() || scope == self.state.scope {
            return Vec::new();
        }

        info!("Switching inbox scope {} -> {}", self.state.scope, scope);
        self.state.scope = scope;
        self.state.items.clear();
        self.state.current_page = 1;
        self.state.total_pages = 1;
        self.state.total_count = 0;
        self.state.search_input.clear();
        self.next_token = None;
        self.debounce_generation += 1;

        if self.lifecycle == Lifecycle::Created {
            return Vec::new();
        }
        self.issue(RequestMode::Paginated { page: 1 }, PageCursor::Start)
    }

    /// Load page `target`
    ///
    /// No-op in search mode, for the page currently shown, and for pages
    /// outside `1..=total_pages`.
    pub fn change_page(&mut self, target: u32) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Mounted {
            return Vec::new();
        }
        if self.state.mode == ViewMode::Search {
            debug!("Ignoring page change to {} in search mode", target);
            return Vec::new();
        }
        if target == self.state.current_page || target < 1 || target > self.state.total_pages {
            return Vec::new();
        }

        let cursor = resolve_cursor(
            self.state.scope,
            self.state.current_page,
            self.next_token.as_deref(),
            target,
        );
        debug!("Changing page {} -> {} via {}", self.state.current_page, target, cursor);
        self.issue(RequestMode::Paginated { page: target }, cursor)
    }

    /// Record search box input; the fetch waits for the debounce window
    ///
    /// Clearing the input while search results are shown returns to page 1
    /// immediately. Input shorter than the minimum length never searches.
    pub fn set_search_query(&mut self, raw: &str) -> Vec<Effect> {
        if self.is_unmounted() {
            return Vec::new();
        }

        self.state.search_input = raw.to_string();
        // Any pending timer belongs to older input
        self.debounce_generation += 1;

        if raw.trim().is_empty() {
            if self.state.mode != ViewMode::Search || self.lifecycle != Lifecycle::Mounted {
                return Vec::new();
            }
            debug!("Search cleared, back to page 1");
            return self.issue(RequestMode::Paginated { page: 1 }, PageCursor::Start);
        }

        if !is_searchable(raw, self.settings.min_query_len) {
            trace!("Query {:?} below minimum length", raw);
            return Vec::new();
        }

        vec![Effect::ScheduleDebounce {
            generation: self.debounce_generation,
            delay: self.settings.search_debounce(),
        }]
    }

    /// The debounce timer armed for `generation` fired
    pub fn debounce_elapsed(&mut self, generation: u64) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Mounted || generation != self.debounce_generation {
            return Vec::new();
        }
        if !is_searchable(&self.state.search_input, self.settings.min_query_len) {
            return Vec::new();
        }

        // One search per timer
        self.debounce_generation += 1;
        let query = self.state.search_input.trim().to_string();
        debug!("Searching for {:?}", query);
        self.issue(RequestMode::Search { query }, PageCursor::Start)
    }

    /// Re-issue the current view's request
    pub fn refresh(&mut self) -> Vec<Effect> {
        match self.lifecycle {
            Lifecycle::Created => self.mount(),
            Lifecycle::Unmounted => Vec::new(),
            Lifecycle::Mounted => {
                let (mode, cursor) = match &self.current {
                    Some(request) => (request.mode.clone(), request.cursor.clone()),
                    None => (RequestMode::Paginated { page: 1 }, PageCursor::Start),
                };
                debug!("Refreshing inbox ({:?})", mode);
                self.issue(mode, cursor)
            }
        }
    }

    /// Feed back the settlement of a fetch
    pub fn apply_outcome(
        &mut self,
        id: RequestId,
        scope: AccountScope,
        outcome: FetchOutcome,
    ) -> Vec<Effect> {
        let cancelled = outcome.as_ref().is_err_and(FetchError::is_cancelled);
        if self.in_flight == Some(id) && cancelled {
            self.in_flight = None;
        }

        if self.lifecycle != Lifecycle::Mounted {
            return Vec::new();
        }
        if !self.guard.is_latest(id) || scope != self.state.scope {
            trace!("Discarding stale response {} for scope {}", id, scope);
            return Vec::new();
        }

        let mode = match &self.current {
            Some(request) if request.id == id => request.mode.clone(),
            _ => return Vec::new(),
        };

        match outcome {
            Err(FetchError::Cancelled) => Vec::new(),
            Ok(page) => {
                self.in_flight = None;
                self.apply_page(mode, page);
                Vec::new()
            }
            Err(FetchError::Unauthorized) => {
                self.in_flight = None;
                warn!("Inbox request {} rejected: session expired", id);
                self.fail(ViewError::SessionExpired);
                vec![Effect::SessionExpired]
            }
            Err(e) => {
                self.in_flight = None;
                warn!("Inbox request {} failed: {}", id, e);
                let message = e.to_string();
                self.fail(ViewError::Fetch(message.clone()));
                vec![Effect::Notify(Notification::Error(format!(
                    "Failed to load messages: {}",
                    message
                )))]
            }
        }
    }

    /// Mark a message read locally (opened in the reader)
    pub fn mark_read(&mut self, id: &MessageId) -> bool {
        match self.state.items.iter_mut().find(|m| &m.id == id) {
            Some(message) if !message.read => {
                message.read = true;
                true
            }
            _ => false,
        }
    }

    /// Hide a message from the list without touching the server
    pub fn dismiss(&mut self, id: &MessageId) -> bool {
        let before = self.state.items.len();
        self.state.items.retain(|m| &m.id != id);
        self.state.items.len() != before
    }

    /// Clear the error shown with the list
    pub fn error_dismissed(&mut self) {
        self.state.last_error = None;
    }

    /// Delete the given messages, grouped by owning account
    pub fn delete_messages(&mut self, ids: &[MessageId]) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Mounted {
            return Vec::new();
        }
        if ids.is_empty() {
            return vec![Effect::Notify(Notification::Error(
                "No messages selected".to_string(),
            ))];
        }

        let mut batches: BTreeMap<AccountId, Vec<MessageId>> = BTreeMap::new();
        let mut unresolved = 0;
        for id in ids {
            let owner = self
                .state
                .find(id)
                .and_then(|m| m.account_id)
                .or_else(|| self.state.scope.account_id());
            match owner {
                Some(account_id) => batches.entry(account_id).or_default().push(id.clone()),
                None => unresolved += 1,
            }
        }

        let mut effects = Vec::new();
        if unresolved > 0 {
            warn!("Could not determine the account for {} messages", unresolved);
            effects.push(Effect::Notify(Notification::Error(format!(
                "Could not determine the account for {} message(s)",
                unresolved
            ))));
        }
        if !batches.is_empty() {
            effects.push(Effect::Delete { batches });
        }
        effects
    }

    /// Apply the result of a deletion, whichever request loaded the rows
    pub fn deletion_finished(&mut self, report: DeletionReport) -> Vec<Effect> {
        if self.is_unmounted() {
            return Vec::new();
        }

        let deleted: HashSet<&MessageId> = report.deleted.iter().collect();
        let before = self.state.items.len();
        self.state.items.retain(|m| !deleted.contains(&m.id));
        let removed = before - self.state.items.len();
        self.state.total_count = self.state.total_count.saturating_sub(removed);

        let mut effects = Vec::new();
        if !report.deleted.is_empty() {
            info!("Deleted {} messages", report.deleted.len());
            effects.push(Effect::Notify(Notification::Info(format!(
                "Deleted {} message(s)",
                report.deleted.len()
            ))));
        }
        if report.failed > 0 {
            effects.push(Effect::Notify(Notification::Error(format!(
                "Failed to delete {} message(s)",
                report.failed
            ))));
        }
        if report.unauthorized {
            effects.push(Effect::SessionExpired);
        }
        effects
    }

    /// Supersede whatever is pending with a fresh request
    fn issue(&mut self, mode: RequestMode, cursor: PageCursor) -> Vec<Effect> {
        let mut effects = Vec::with_capacity(2);
        if let Some(previous) = self.in_flight.take() {
            effects.push(Effect::Cancel(previous));
        }

        let request = ViewRequest {
            id: self.guard.issue(),
            scope: self.state.scope,
            cursor,
            mode,
        };
        debug!("Issuing request {} for scope {} ({:?})", request.id, request.scope, request.mode);

        self.state.mode = request.mode.view_mode();
        self.state.phase = Phase::Loading;
        self.state.is_loading = true;
        self.state.last_error = None;
        self.in_flight = Some(request.id);
        self.current = Some(request.clone());

        effects.push(Effect::Fetch(request));
        effects
    }

    fn apply_page(&mut self, mode: RequestMode, page: MessagePage) {
        let items = prepare_items(page.items, self.state.scope);

        match mode {
            RequestMode::Paginated { page: number } => {
                let total_count = page.total_count.unwrap_or(items.len());
                let mut pages = total_pages(total_count, self.settings.page_size);
                if page.next_token.is_some() {
                    pages = pages.max(number.saturating_add(1));
                }

                self.state.items = items;
                self.state.total_count = total_count;
                self.state.total_pages = pages;
                self.state.current_page = number;
                self.next_token = page.next_token;
            }
            RequestMode::Search { query } => {
                let matches = filter_matches(items, &query);
                info!("Search {:?} matched {} messages", query, matches.len());
                self.state.total_count = matches.len();
                self.state.items = matches;
                self.state.total_pages = 1;
                self.state.current_page = 1;
                self.next_token = None;
            }
        }

        self.state.phase = Phase::Loaded;
        self.state.is_loading = false;
        self.state.last_error = None;
        debug!(
            "Loaded {} messages (page {}/{}, mode {:?})",
            self.state.items.len(),
            self.state.current_page,
            self.state.total_pages,
            self.state.mode
        );
    }

    /// Enter the error phase, keeping whatever was loaded before
    fn fail(&mut self, error: ViewError) {
        self.state.phase = Phase::Error;
        self.state.is_loading = false;
        self.state.last_error = Some(error);
    }
}

/// Scope-filter, order newest first and de-duplicate a batch of rows
fn prepare_items(items: Vec<MessageSummary>, scope: AccountScope) -> Vec<MessageSummary> {
    let mut items: Vec<MessageSummary> = match scope.account_id() {
        Some(account) => items
            .into_iter()
            .filter(|m| m.account_id.is_none_or(|owner| owner == account))
            .map(|mut m| {
                m.account_id = Some(account);
                m
            })
            .collect(),
        None => items,
    };

    // Stable: rows without a date keep their order at the end
    items.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    items.retain(|m| seen.insert(m.id.clone()));
    items
}
