//! Error types for the record hooks execution context.

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a record store implementation.
///
/// Cloneable so a memoized failure can be handed back on every later access.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Record not found: {type_name} {id}")]
    NotFound { type_name: String, id: Uuid },

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store data error: {0}")]
    Data(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    #[error("Store rejected operation: {0}")]
    Rejected(String),
}

/// Errors surfaced to handlers by the execution context.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Type mismatch for '{attribute}': expected {expected}, found {actual}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Query failed on page {page}: {source}")]
    QueryFailed {
        page: u32,
        #[source]
        source: StoreError,
    },

    #[error("Store operation '{operation}' failed: {source}")]
    StoreOperationFailed {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    Rejected(String),
}

impl ContextError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ContextError::NotFound(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ContextError::ConfigurationError(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ContextError::Rejected(message.into())
    }

    pub(crate) fn store_op(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ContextError::StoreOperationFailed { operation, source }
    }
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::ConfigurationError(err.to_string())
    }
}

/// Failure of one dispatched event, as reported to the caller of the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The context could not be built or its target could not be resolved.
    #[error("Event '{message}' on '{entity}' could not start: {source}")]
    ContextUnavailable {
        message: String,
        entity: String,
        #[source]
        source: ContextError,
    },

    /// A handler returned an error; the original message is kept verbatim.
    #[error("Handler '{handler}' failed: {message}")]
    HandlerFailed {
        handler: String,
        message: String,
        source: ContextError,
        trace: Vec<String>,
    },
}

/// Top-level failure for the binary: configuration, input files, store, or dispatch.
#[derive(Debug, Error)]
pub enum HooksError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<config::ConfigError> for HooksError {
    fn from(err: config::ConfigError) -> Self {
        HooksError::Config(err.to_string())
    }
}
