//! Async driver for the inbox coordinator
//!
//! [`InboxRuntime`] owns an [`InboxCoordinator`] on a single tokio task.
//! User triggers arrive through an [`InboxHandle`]; fetch settlements,
//! debounce timers and deletion reports come back over an internal channel,
//! so every state transition happens on the runtime task in arrival order.
//! The latest [`ViewState`] is published on a watch channel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::coordinator::{DeletionReport, Effect, FetchOutcome, InboxCoordinator, Notification};
use super::fetch::{delete_batches, execute_request};
use super::request::{RequestId, ViewRequest};
use super::state::ViewState;
use crate::api::{FetchError, MailApi};
use crate::config::InboxSettings;
use crate::models::{AccountId, AccountScope, MessageId};

/// User intent forwarded to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    SwitchScope(AccountScope),
    ChangePage(u32),
    SetSearchQuery(String),
    Refresh,
    MarkRead(MessageId),
    Dismiss(MessageId),
    Delete(Vec<MessageId>),
    DismissError,
    Unmount,
}

/// Settlements produced by work the runtime started
#[derive(Debug)]
enum Event {
    Settled {
        id: RequestId,
        scope: AccountScope,
        outcome: FetchOutcome,
    },
    DebounceElapsed(u64),
    DeletionFinished(DeletionReport),
}

/// Receives user-facing side effects of the inbox
pub trait Notifier: Send + Sync {
    /// Show a toast
    fn notify(&self, notification: &Notification);

    /// The backend rejected the credential; the user must sign in again
    fn session_expired(&self);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Info(msg) => info!("{}", msg),
            Notification::Error(msg) => error!("{}", msg),
        }
    }

    fn session_expired(&self) {
        warn!("Session expired, sign in again");
    }
}

/// The runtime task has stopped and no longer accepts triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("inbox runtime has stopped")]
pub struct InboxClosed;

/// Cloneable front end of a running [`InboxRuntime`]
#[derive(Clone)]
pub struct InboxHandle {
    triggers: mpsc::UnboundedSender<Trigger>,
    state: watch::Receiver<ViewState>,
}

impl InboxHandle {
    pub fn send(&self, trigger: Trigger) -> Result<(), InboxClosed> {
        self.triggers.send(trigger).map_err(|_| InboxClosed)
    }

    pub fn switch_scope(&self, scope: AccountScope) -> Result<(), InboxClosed> {
        self.send(Trigger::SwitchScope(scope))
    }

    pub fn change_page(&self, page: u32) -> Result<(), InboxClosed> {
        self.send(Trigger::ChangePage(page))
    }

    pub fn set_search_query(&self, query: impl Into<String>) -> Result<(), InboxClosed> {
        self.send(Trigger::SetSearchQuery(query.into()))
    }

    pub fn refresh(&self) -> Result<(), InboxClosed> {
        self.send(Trigger::Refresh)
    }

    pub fn mark_read(&self, id: MessageId) -> Result<(), InboxClosed> {
        self.send(Trigger::MarkRead(id))
    }

    pub fn dismiss(&self, id: MessageId) -> Result<(), InboxClosed> {
        self.send(Trigger::Dismiss(id))
    }

    pub fn delete(&self, ids: Vec<MessageId>) -> Result<(), InboxClosed> {
        self.send(Trigger::Delete(ids))
    }

    pub fn dismiss_error(&self) -> Result<(), InboxClosed> {
        self.send(Trigger::DismissError)
    }

    pub fn unmount(&self) -> Result<(), InboxClosed> {
        self.send(Trigger::Unmount)
    }

    /// Receiver notified on every published state change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Latest published state
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }
}

/// Executes coordinator effects on tokio
pub struct InboxRuntime {
    coordinator: InboxCoordinator,
    api: Arc<dyn MailApi>,
    notifier: Arc<dyn Notifier>,
    triggers: mpsc::UnboundedReceiver<Trigger>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    state_tx: watch::Sender<ViewState>,
    /// Cancellation tokens of fetches that have not settled yet
    in_flight: HashMap<RequestId, CancellationToken>,
    debounce: Option<JoinHandle<()>>,
}

impl InboxRuntime {
    pub fn new(
        api: Arc<dyn MailApi>,
        notifier: Arc<dyn Notifier>,
        settings: InboxSettings,
        scope: AccountScope,
    ) -> (Self, InboxHandle) {
        let coordinator = InboxCoordinator::new(scope, settings);
        let (triggers_tx, triggers) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(coordinator.state().clone());

        let runtime = Self {
            coordinator,
            api,
            notifier,
            triggers,
            events_tx,
            events,
            state_tx,
            in_flight: HashMap::new(),
            debounce: None,
        };
        let handle = InboxHandle {
            triggers: triggers_tx,
            state,
        };
        (runtime, handle)
    }

    /// Run on a new tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Mount, then process triggers until unmounted or every handle is dropped
    pub async fn run(mut self) {
        let effects = self.coordinator.mount();
        self.dispatch(effects);

        loop {
            tokio::select! {
                trigger = self.triggers.recv() => match trigger {
                    None => break,
                    Some(trigger) => {
                        let effects = self.handle_trigger(trigger);
                        self.dispatch(effects);
                        if self.coordinator.is_unmounted() {
                            break;
                        }
                    }
                },
                Some(event) = self.events.recv() => {
                    let effects = self.handle_event(event);
                    self.dispatch(effects);
                }
            }
        }

        let effects = self.coordinator.unmount();
        self.dispatch(effects);
        if let Some(task) = self.debounce.take() {
            task.abort();
        }
        for (_, token) in self.in_flight.drain() {
            token.cancel();
        }
        debug!("Inbox runtime stopped");
    }

    fn handle_trigger(&mut self, trigger: Trigger) -> Vec<Effect> {
        match trigger {
            Trigger::SwitchScope(scope) => self.coordinator.switch_scope(scope),
            Trigger::ChangePage(page) => self.coordinator.change_page(page),
            Trigger::SetSearchQuery(query) => self.coordinator.set_search_query(&query),
            Trigger::Refresh => self.coordinator.refresh(),
            Trigger::MarkRead(id) => {
                self.coordinator.mark_read(&id);
                Vec::new()
            }
            Trigger::Dismiss(id) => {
                self.coordinator.dismiss(&id);
                Vec::new()
            }
            Trigger::Delete(ids) => self.coordinator.delete_messages(&ids),
            Trigger::DismissError => {
                self.coordinator.error_dismissed();
                Vec::new()
            }
            Trigger::Unmount => self.coordinator.unmount(),
        }
    }

    fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Settled { id, scope, outcome } => {
                self.in_flight.remove(&id);
                self.coordinator.apply_outcome(id, scope, outcome)
            }
            Event::DebounceElapsed(generation) => {
                self.debounce = None;
                self.coordinator.debounce_elapsed(generation)
            }
            Event::DeletionFinished(report) => self.coordinator.deletion_finished(report),
        }
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(request) => self.start_fetch(request),
                Effect::Cancel(id) => {
                    if let Some(token) = self.in_flight.remove(&id) {
                        debug!("Cancelling request {}", id);
                        token.cancel();
                    }
                }
                Effect::ScheduleDebounce { generation, delay } => {
                    self.schedule_debounce(generation, delay)
                }
                Effect::Notify(notification) => self.notifier.notify(&notification),
                Effect::SessionExpired => self.notifier.session_expired(),
                Effect::Delete { batches } => self.start_delete(batches),
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let state = self.coordinator.state();
        self.state_tx.send_if_modified(|current| {
            if current == state {
                return false;
            }
            *current = state.clone();
            true
        });
    }

    fn start_fetch(&mut self, request: ViewRequest) {
        let cancel = CancellationToken::new();
        self.in_flight.insert(request.id, cancel.clone());

        let api = Arc::clone(&self.api);
        let settings = self.coordinator.settings().clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let (id, scope) = (request.id, request.scope);
            let transport_cancel = cancel.clone();
            let work = tokio::task::spawn_blocking(move || {
                execute_request(api.as_ref(), &request, &settings, &transport_cancel)
            });

            // The blocking call cannot be interrupted; stop waiting for it instead
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                joined = work => joined.unwrap_or_else(|e| {
                    Err(FetchError::Transport(format!("fetch task failed: {}", e)))
                }),
            };
            let _ = events.send(Event::Settled { id, scope, outcome });
        });
    }

    fn schedule_debounce(&mut self, generation: u64, delay: Duration) {
        if let Some(task) = self.debounce.take() {
            task.abort();
        }
        let events = self.events_tx.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::DebounceElapsed(generation));
        }));
    }

    fn start_delete(&self, batches: BTreeMap<AccountId, Vec<MessageId>>) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let report = tokio::task::spawn_blocking(move || delete_batches(api.as_ref(), &batches))
                .await
                .unwrap_or_else(|e| {
                    error!("Delete task failed: {}", e);
                    DeletionReport {
                        failed: 1,
                        ..Default::default()
                    }
                });
            let _ = events.send(Event::DeletionFinished(report));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MessagePage, PageCursor};
    use crate::inbox::state::Phase;
    use crate::models::{Account, MessageSummary};

    struct SingleMessage;

    impl MailApi for SingleMessage {
        fn fetch_messages(
            &self,
            _scope: AccountScope,
            _cursor: &PageCursor,
            _page_size: usize,
        ) -> Result<MessagePage, FetchError> {
            Ok(MessagePage {
                items: vec![MessageSummary::builder("m1").subject("Hello").build()],
                next_token: None,
                total_count: Some(1),
            })
        }

        fn list_accounts(&self) -> Result<Vec<Account>, FetchError> {
            Ok(Vec::new())
        }

        fn delete_message(&self, _: AccountId, _: &MessageId) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn runtime() -> (InboxRuntime, InboxHandle) {
        InboxRuntime::new(
            Arc::new(SingleMessage),
            Arc::new(LogNotifier),
            InboxSettings::default(),
            AccountScope::All,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_mounts_and_publishes() {
        let (runtime, handle) = runtime();
        assert_eq!(handle.snapshot().phase, Phase::Idle);

        let task = runtime.spawn();
        let mut updates = handle.subscribe();
        let state = updates
            .wait_for(|s| s.phase == Phase::Loaded)
            .await
            .unwrap()
            .clone();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.total_pages, 1);

        handle.unmount().unwrap();
        task.await.unwrap();
        assert_eq!(handle.refresh(), Err(InboxClosed));
    }

    #[test]
    fn test_handle_reports_stopped_runtime() {
        let (runtime, handle) = runtime();
        drop(runtime);
        assert_eq!(handle.refresh(), Err(InboxClosed));
    }
}
