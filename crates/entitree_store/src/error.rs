//! Error types for store operations.

use crate::key::RecordKey;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with the same key already exists in the table.
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey {
        /// The table written to.
        table: String,
        /// The conflicting key.
        key: RecordKey,
    },

    /// The record to update does not exist.
    #[error("record {key} not found in table {table}")]
    NotFound {
        /// The table searched.
        table: String,
        /// The missing key.
        key: RecordKey,
    },

    /// `commit` or `rollback` was called without an open transaction.
    #[error("no active transaction")]
    NoTransaction,

    /// The transaction was marked rollback-only by a nested scope.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// An expression could not be evaluated or rendered.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A failure raised on purpose by a fault-injecting wrapper.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid expression error.
    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Self::InvalidExpression(message.into())
    }
}
