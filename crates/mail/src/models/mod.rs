//! Domain models for mail entities

mod account;
mod message;

pub use account::{Account, AccountId, AccountKind, AccountScope, ParseScopeError};
pub use message::{MessageId, MessageSummary, MessageSummaryBuilder};
