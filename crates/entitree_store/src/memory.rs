//! In-memory store for testing and small embedded trees.

use crate::backend::TreeStore;
use crate::error::{StoreError, StoreResult};
use crate::expr::{compare_records, Assignment, Expr, OrderBy, Predicate};
use crate::key::RecordKey;
use crate::record::Record;
use crate::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

type Tables = HashMap<String, BTreeMap<RecordKey, Record>>;

/// Open transaction bookkeeping.
#[derive(Debug)]
struct TxnState {
    /// Nesting depth; the outermost scope is depth 1.
    depth: usize,
    /// Tables as they were when the outermost scope began.
    snapshot: Tables,
    /// Set when an inner scope rolled back.
    rollback_only: bool,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    txn: Option<TxnState>,
}

/// An in-memory [`TreeStore`].
///
/// This store keeps every table in a `BTreeMap` keyed by [`RecordKey`] and
/// is suitable for:
/// - Unit and property tests
/// - The CLI, which persists it as a JSON snapshot
/// - Small embedded trees that fit in memory
///
/// # Transactions
///
/// There is one transaction context per store. `begin` snapshots the
/// tables, reads inside the transaction observe its own writes, and
/// `rollback` restores the snapshot. Writes outside a transaction apply
/// immediately.
///
/// # Example
///
/// ```rust
/// use entitree_store::{MemoryStore, Record, TreeStore, Predicate, Expr};
///
/// let store = MemoryStore::new();
/// store.insert("nodes", &Record::new().field("code", "0001")).unwrap();
/// let rows = store
///     .query("nodes", &Predicate::starts_with(Expr::field("code"), "0001"), &[])
///     .unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    writes: AtomicU64,
}

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Rows per table, in key order.
    pub tables: BTreeMap<String, Vec<Record>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let tables: Tables = snapshot
            .tables
            .into_iter()
            .map(|(name, rows)| {
                let rows: BTreeMap<RecordKey, Record> =
                    rows.into_iter().map(|r| (r.key(), r)).collect();
                (name, rows)
            })
            .collect();
        Self {
            state: Mutex::new(State { tables, txn: None }),
            writes: AtomicU64::new(0),
        }
    }

    /// Returns a copy of all committed-or-pending rows.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock();
        StoreSnapshot {
            tables: state
                .tables
                .iter()
                .map(|(name, rows)| (name.clone(), rows.values().cloned().collect()))
                .collect(),
        }
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_json(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&text)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the current rows to a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_json(&self, path: &Path) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Returns the number of rows in a table.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.state.lock().tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Returns the number of write statements executed so far.
    ///
    /// Bulk statements count once regardless of how many rows they touch.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns true while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.state.lock().txn.is_some()
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl TreeStore for MemoryStore {
    fn query(
        &self,
        table: &str,
        filter: &Predicate,
        order_by: &[OrderBy],
    ) -> StoreResult<Vec<Record>> {
        let state = self.state.lock();
        let Some(rows) = state.tables.get(table) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Record> = rows
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // BTreeMap iteration already yields key order, so a stable sort
        // keeps ties ordered by key.
        out.sort_by(|a, b| compare_records(a, b, order_by));
        trace!(table, rows = out.len(), "query");
        Ok(out)
    }

    fn max_int(&self, table: &str, expr: &Expr, filter: &Predicate) -> StoreResult<Option<i64>> {
        let state = self.state.lock();
        let Some(rows) = state.tables.get(table) else {
            return Ok(None);
        };
        let mut max: Option<i64> = None;
        for row in rows.values().filter(|r| filter.matches(r)) {
            match expr.eval(row) {
                Value::Int(i) => max = Some(max.map_or(i, |m| m.max(i))),
                Value::Null => {}
                other => {
                    return Err(StoreError::invalid_expression(format!(
                        "MAX over non-integer value {other}"
                    )))
                }
            }
        }
        Ok(max)
    }

    fn insert(&self, table: &str, record: &Record) -> StoreResult<()> {
        let mut state = self.state.lock();
        let rows = state.tables.entry(table.to_string()).or_default();
        if rows.contains_key(&record.key()) {
            return Err(StoreError::DuplicateKey {
                table: table.to_string(),
                key: record.key(),
            });
        }
        rows.insert(record.key(), record.clone());
        drop(state);
        self.count_write();
        Ok(())
    }

    fn update(&self, table: &str, record: &Record) -> StoreResult<()> {
        let mut state = self.state.lock();
        let slot = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(&record.key()))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                key: record.key(),
            })?;
        *slot = record.clone();
        drop(state);
        self.count_write();
        Ok(())
    }

    fn bulk_delete(&self, table: &str, filter: &Predicate) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let removed = match state.tables.get_mut(table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|_, r| !filter.matches(r));
                before - rows.len()
            }
            None => 0,
        };
        drop(state);
        self.count_write();
        Ok(removed)
    }

    fn bulk_update(
        &self,
        table: &str,
        assignments: &[Assignment],
        filter: &Predicate,
    ) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.values_mut().filter(|r| filter.matches(r)) {
                for assignment in assignments {
                    row.set_field(assignment.field.clone(), assignment.value.clone());
                }
                affected += 1;
            }
        }
        drop(state);
        self.count_write();
        Ok(affected)
    }

    fn begin(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        match state.txn.as_mut() {
            Some(txn) => txn.depth += 1,
            None => {
                let snapshot = state.tables.clone();
                state.txn = Some(TxnState {
                    depth: 1,
                    snapshot,
                    rollback_only: false,
                });
            }
        }
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        let txn = state.txn.as_mut().ok_or(StoreError::NoTransaction)?;
        if txn.depth > 1 {
            txn.depth -= 1;
            return Ok(());
        }
        let Some(txn) = state.txn.take() else {
            return Err(StoreError::NoTransaction);
        };
        if txn.rollback_only {
            state.tables = txn.snapshot;
            debug!("commit refused: inner scope rolled back");
            return Err(StoreError::transaction_aborted(
                "an inner scope rolled back",
            ));
        }
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        let txn = state.txn.as_mut().ok_or(StoreError::NoTransaction)?;
        if txn.depth > 1 {
            txn.depth -= 1;
            txn.rollback_only = true;
            return Ok(());
        }
        if let Some(txn) = state.txn.take() {
            state.tables = txn.snapshot;
        }
        debug!("transaction rolled back");
        Ok(())
    }
}
