//! Mail crate - Business logic for the unified inbox
//!
//! This crate provides platform-independent inbox functionality including:
//! - Domain models (Account, AccountScope, MessageSummary)
//! - The mail-data REST client and credential providers
//! - Inbox settings
//! - The inbox coordinator and its async runtime
//!
//! This crate has zero UI dependencies; front ends drive it through an
//! [`InboxHandle`] and render the published [`ViewState`].

pub mod api;
pub mod config;
pub mod inbox;
pub mod models;

pub use api::{
    CredentialProvider, FetchError, HttpMailApi, MailApi, MessagePage, PageCursor, SessionFile,
    StaticCredentials,
};
pub use crate::config::InboxSettings;
pub use inbox::{
    DeletionReport, Effect, InboxClosed, InboxCoordinator, InboxHandle, InboxRuntime, LogNotifier,
    Notification, Notifier, Phase, RequestId, Trigger, ViewError, ViewMode, ViewRequest, ViewState,
};
pub use models::{Account, AccountId, AccountKind, AccountScope, MessageId, MessageSummary};
