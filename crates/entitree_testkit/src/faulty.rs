//! Fault injection for rollback tests.
//!
//! [`FaultyStore`] wraps a [`MemoryStore`] and fails write statements or
//! commits on demand, so tests can check that a failed mutation leaves
//! the tree exactly as it was.

use entitree_store::{
    Assignment, Expr, MemoryStore, OrderBy, Predicate, Record, StoreError, StoreResult, TreeStore,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A store wrapper that can simulate write failures.
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    fail_after_writes: AtomicU64,
    writes: AtomicU64,
    fail_on_commit: AtomicBool,
    failures: AtomicU64,
}

impl FaultyStore {
    /// Wraps `inner`. No faults are armed.
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_after_writes: AtomicU64::new(u64::MAX),
            writes: AtomicU64::new(0),
            fail_on_commit: AtomicBool::new(false),
            failures: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<MemoryStore> {
        &self.inner
    }

    /// Lets `writes` more write statements through, then fails every
    /// following one.
    pub fn fail_after(&self, writes: u64) {
        self.writes.store(0, Ordering::SeqCst);
        self.fail_after_writes.store(writes, Ordering::SeqCst);
    }

    /// Sets whether commits fail.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Disarms every fault.
    pub fn reset(&self) {
        self.fail_after_writes.store(u64::MAX, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.fail_on_commit.store(false, Ordering::SeqCst);
    }

    /// Number of failures injected so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    fn admit_write(&self, what: &str) -> StoreResult<()> {
        let done = self.writes.fetch_add(1, Ordering::SeqCst);
        if done >= self.fail_after_writes.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Injected(format!(
                "simulated failure during {what}"
            )));
        }
        Ok(())
    }
}

impl TreeStore for FaultyStore {
    fn query(
        &self,
        table: &str,
        filter: &Predicate,
        order_by: &[OrderBy],
    ) -> StoreResult<Vec<Record>> {
        self.inner.query(table, filter, order_by)
    }

    fn max_int(&self, table: &str, expr: &Expr, filter: &Predicate) -> StoreResult<Option<i64>> {
        self.inner.max_int(table, expr, filter)
    }

    fn insert(&self, table: &str, record: &Record) -> StoreResult<()> {
        self.admit_write("insert")?;
        self.inner.insert(table, record)
    }

    fn update(&self, table: &str, record: &Record) -> StoreResult<()> {
        self.admit_write("update")?;
        self.inner.update(table, record)
    }

    fn bulk_delete(&self, table: &str, filter: &Predicate) -> StoreResult<usize> {
        self.admit_write("bulk delete")?;
        self.inner.bulk_delete(table, filter)
    }

    fn bulk_update(
        &self,
        table: &str,
        assignments: &[Assignment],
        filter: &Predicate,
    ) -> StoreResult<usize> {
        self.admit_write("bulk update")?;
        self.inner.bulk_update(table, assignments, filter)
    }

    fn begin(&self) -> StoreResult<()> {
        self.inner.begin()
    }

    fn commit(&self) -> StoreResult<()> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Injected("simulated failure during commit".into()));
        }
        self.inner.commit()
    }

    fn rollback(&self) -> StoreResult<()> {
        self.inner.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_after_budget() {
        let store = FaultyStore::new(Arc::new(MemoryStore::new()));
        store.fail_after(1);
        store.insert("t", &Record::new()).unwrap();
        let err = store.insert("t", &Record::new()).unwrap_err();
        assert!(matches!(err, StoreError::Injected(_)));
        assert_eq!(store.failures(), 1);
        assert_eq!(store.inner().len("t"), 1);

        store.reset();
        store.insert("t", &Record::new()).unwrap();
        assert_eq!(store.inner().len("t"), 2);
    }

    #[test]
    fn commit_failure_keeps_transaction_open() {
        let store = FaultyStore::new(Arc::new(MemoryStore::new()));
        store.set_fail_on_commit(true);
        store.begin().unwrap();
        store.insert("t", &Record::new()).unwrap();
        assert!(store.commit().is_err());
        store.rollback().unwrap();
        assert!(store.inner().is_empty("t"));
    }
}
