//! Backing-store trait definition.

use crate::error::StoreResult;
use crate::expr::{Assignment, Expr, OrderBy, Predicate};
use crate::record::Record;

/// The backing store a tree engine persists through.
///
/// A store is a set of flat tables of [`Record`]s. It knows nothing about
/// trees: the engine expresses every read as a single-table predicate and
/// every write as a keyed insert/update or a predicate-scoped bulk
/// statement.
///
/// # Invariants
///
/// - `query` returns rows sorted by `order_by`, ties broken by key
/// - `insert` fails on a duplicate key, `update` fails on a missing key
/// - Writes issued between `begin` and the matching `commit` become
///   visible atomically; `rollback` discards all of them
/// - `begin` may nest; only the outermost `commit` publishes, and a
///   `rollback` at any depth dooms the whole transaction
/// - Stores must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::MemoryStore`] - Reference implementation and test backend
pub trait TreeStore: Send + Sync {
    /// Returns every row of `table` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot evaluate the filter.
    fn query(&self, table: &str, filter: &Predicate, order_by: &[OrderBy])
        -> StoreResult<Vec<Record>>;

    /// Returns `MAX(expr)` over the rows matching `filter`, or `None` when
    /// no row matches or every value is null.
    ///
    /// # Errors
    ///
    /// Returns an error if `expr` does not evaluate to an integer.
    fn max_int(&self, table: &str, expr: &Expr, filter: &Predicate) -> StoreResult<Option<i64>>;

    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::DuplicateKey`] if the key exists.
    fn insert(&self, table: &str, record: &Record) -> StoreResult<()>;

    /// Replaces an existing row, matched by key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if the key does not exist.
    fn update(&self, table: &str, record: &Record) -> StoreResult<()>;

    /// Deletes every row matching `filter`, returning the affected count.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn bulk_delete(&self, table: &str, filter: &Predicate) -> StoreResult<usize>;

    /// Applies `assignments` to every row matching `filter`, returning the
    /// affected count.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn bulk_update(
        &self,
        table: &str,
        assignments: &[Assignment],
        filter: &Predicate,
    ) -> StoreResult<usize>;

    /// Opens a transaction scope. Scopes nest.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a transaction.
    fn begin(&self) -> StoreResult<()>;

    /// Closes the innermost scope. The outermost commit publishes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoTransaction`] without an open scope,
    /// or [`crate::StoreError::TransactionAborted`] when an inner scope
    /// rolled back.
    fn commit(&self) -> StoreResult<()>;

    /// Abandons the innermost scope and dooms the enclosing transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoTransaction`] without an open scope.
    fn rollback(&self) -> StoreResult<()>;
}
