//! Error types for the tree engine.

use entitree_store::StoreError;
use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur in tree operations.
///
/// `CodeOverflow`, `IllegalMove`, `InvalidCode`, `NodeNotFound` and
/// `InvalidOperation` are raised while planning, before anything is
/// written. `Storage` wraps a backing-store failure; when it happens in
/// the write phase the transaction has already been rolled back.
#[derive(Debug, Error)]
pub enum TreeError {
    /// An order number does not fit in the fixed segment width.
    #[error("order {order} does not fit in {sign_length} digits")]
    CodeOverflow {
        /// The order that overflowed.
        order: u64,
        /// Configured segment width.
        sign_length: usize,
    },

    /// The move would make a node its own ancestor.
    #[error("illegal move: {message}")]
    IllegalMove {
        /// Description of the rejected move.
        message: String,
    },

    /// The backing store failed.
    #[error("{context}: {source}")]
    Storage {
        /// What the engine was doing.
        context: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Metadata lacks a required binding or is inconsistent.
    #[error("tree metadata missing: {message}")]
    MetadataMissing {
        /// What is missing.
        message: String,
    },

    /// A code is not a whole number of digit segments.
    #[error("invalid inner code {code:?} for segment width {sign_length}")]
    InvalidCode {
        /// The malformed code.
        code: String,
        /// Configured segment width.
        sign_length: usize,
    },

    /// A node the operation depends on does not exist.
    #[error("node not found: {message}")]
    NodeNotFound {
        /// Which node was looked up.
        message: String,
    },

    /// Operation not permitted for this node or configuration.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl TreeError {
    /// Creates an illegal move error.
    pub fn illegal_move(message: impl Into<String>) -> Self {
        Self::IllegalMove {
            message: message.into(),
        }
    }

    /// Creates a metadata missing error.
    pub fn metadata_missing(message: impl Into<String>) -> Self {
        Self::MetadataMissing {
            message: message.into(),
        }
    }

    /// Creates a node not found error.
    pub fn node_not_found(message: impl Into<String>) -> Self {
        Self::NodeNotFound {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps a store error with operation context.
    pub fn storage(context: impl Into<String>, source: StoreError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Returns true for errors raised before any write was attempted.
    #[must_use]
    pub fn is_pre_write(&self) -> bool {
        !matches!(self, Self::Storage { .. })
    }
}

/// Attaches operation context to store results.
pub(crate) trait StoreContext<T> {
    fn context(self, context: &str) -> TreeResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context(self, context: &str) -> TreeResult<T> {
        self.map_err(|e| TreeError::storage(context, e))
    }
}
