//! Record Hooks: event-triggered handlers over business records
//!
//! Handlers receive an [`context::ExecutionContext`] for each record event. The context gives
//! typed attribute access, current-over-previous resolution for updates, paged queries, and
//! store operations scoped to the calling user. A [`dispatch::Dispatcher`] routes events to
//! handlers registered by message and entity.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handlers;
pub mod logging;
pub mod query;
pub mod record;
pub mod store;
pub mod types;

pub use context::ExecutionContext;
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{ContextError, DispatchError, HooksError, StoreError};
pub use event::{MessageName, PluginEvent};
pub use record::Record;
pub use types::{EntityReference, Value};
