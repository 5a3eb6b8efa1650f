//! Tree mutation engine.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. Plan: read the affected neighbourhood through the
//!    [`TreeQueryPlanner`]. No locks, no writes.
//! 2. Compute: derive new codes, orders, levels and full names in memory.
//!    Overflow and illegal moves are detected here.
//! 3. Write: offer each row to the pre-write hook, then write the accepted
//!    rows inside one store transaction, rolling back on any failure.
//! 4. Notify: publish the written rows on the change feed.

mod mutation;
mod query;
mod verify;

pub use query::TreeView;
pub use verify::{VerifyReport, Violation, ViolationKind};

use crate::change::{ChangeArgument, MutationKind, TreeHook, TreeSnapshot};
use crate::config::EngineConfig;
use crate::error::{StoreContext, TreeError, TreeResult};
use crate::feed::TreeChangeFeed;
use crate::metadata::{MetadataRegistry, TreeMetadata};
use crate::planner::TreeQueryPlanner;
use entitree_store::{Assignment, Predicate, Record, RecordKey, StoreResult, TreeStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Location of a node decoded from its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodePos {
    pub(crate) code: String,
    pub(crate) level: u32,
    pub(crate) order: u32,
}

/// What to do with one row.
#[derive(Debug)]
enum RowWrite {
    Insert(Record),
    Update(Record),
    Delete,
    SoftDelete,
}

/// One row of a planned mutation.
#[derive(Debug)]
pub(crate) struct PlannedWrite {
    kind: MutationKind,
    change: ChangeArgument,
    write: RowWrite,
}

/// Persists tree-shaped records of one node type.
///
/// The engine is synchronous and performs no threading of its own. It is
/// safe to share between threads; isolation between concurrent mutations
/// of overlapping subtrees is whatever the store's transactions provide.
///
/// # Example
///
/// ```rust
/// use entitree_core::{Position, TreeEngine, TreeMetadata};
/// use entitree_store::{MemoryStore, Record};
/// use std::sync::Arc;
///
/// let metadata = TreeMetadata::builder("category")
///     .code("code")
///     .name("name")
///     .full_name("full_name")
///     .build()
///     .unwrap();
/// let engine = TreeEngine::new(Arc::new(MemoryStore::new()), metadata);
///
/// let mut books = Record::new().field("name", "Books");
/// engine.create(&mut books, "").unwrap();
/// let mut poetry = Record::new().field("name", "Poetry");
/// engine.insert(&mut poetry, &books, Position::Children).unwrap();
///
/// assert_eq!(poetry.text("code"), Some("00010001"));
/// assert_eq!(poetry.text("full_name"), Some("Books/Poetry"));
/// ```
pub struct TreeEngine {
    store: Arc<dyn TreeStore>,
    metadata: Arc<TreeMetadata>,
    config: EngineConfig,
    hook: Option<Arc<dyn TreeHook>>,
    feed: Arc<TreeChangeFeed>,
}

impl TreeEngine {
    /// Creates an engine with default configuration.
    pub fn new(store: Arc<dyn TreeStore>, metadata: impl Into<Arc<TreeMetadata>>) -> Self {
        Self::with_config(store, metadata, EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(
        store: Arc<dyn TreeStore>,
        metadata: impl Into<Arc<TreeMetadata>>,
        config: EngineConfig,
    ) -> Self {
        let feed = Arc::new(TreeChangeFeed::with_max_history(config.max_history));
        Self {
            store,
            metadata: metadata.into(),
            config,
            hook: None,
            feed,
        }
    }

    /// Creates an engine for a node type registered in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::MetadataMissing`] if `table` is not registered.
    pub fn from_registry(
        store: Arc<dyn TreeStore>,
        registry: &MetadataRegistry,
        table: &str,
        config: EngineConfig,
    ) -> TreeResult<Self> {
        Ok(Self::with_config(store, registry.require(table)?, config))
    }

    /// Installs the pre-write hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl TreeHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Shares an existing change feed instead of the engine's own.
    #[must_use]
    pub fn with_feed(mut self, feed: Arc<TreeChangeFeed>) -> Self {
        self.feed = feed;
        self
    }

    /// Node type metadata.
    #[must_use]
    pub fn metadata(&self) -> &TreeMetadata {
        &self.metadata
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change feed of committed mutations.
    #[must_use]
    pub fn feed(&self) -> &Arc<TreeChangeFeed> {
        &self.feed
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    /// Query planner bound to this engine's store and metadata.
    #[must_use]
    pub fn planner(&self) -> TreeQueryPlanner<'_> {
        TreeQueryPlanner::new(self.store.as_ref(), &self.metadata)
    }

    // ------------------------------------------------------------------
    // Field helpers
    // ------------------------------------------------------------------

    pub(crate) fn code_of<'r>(&self, record: &'r Record) -> &'r str {
        record.text(self.metadata.code_field()).unwrap_or_default()
    }

    pub(crate) fn locate(&self, record: &Record) -> TreeResult<NodePos> {
        let code = self.code_of(record);
        if code.is_empty() {
            return Err(TreeError::invalid_operation(format!(
                "node {} has no inner code",
                record.key()
            )));
        }
        let (level, order) = self.metadata.codec().decode(code)?;
        Ok(NodePos {
            code: code.to_string(),
            level,
            order,
        })
    }

    pub(crate) fn name_of(&self, record: &Record) -> String {
        self.metadata
            .name_field()
            .and_then(|f| record.text(f))
            .unwrap_or_default()
            .to_string()
    }

    pub(crate) fn full_name_of(&self, record: &Record) -> Option<String> {
        self.metadata
            .full_name_field()
            .and_then(|f| record.text(f))
            .map(str::to_string)
    }

    fn is_deleted(&self, record: &Record) -> bool {
        self.metadata
            .delete_field()
            .and_then(|f| record.flag(f))
            .unwrap_or(false)
    }

    /// Joins a parent's full name and a child's name.
    pub(crate) fn join_names(&self, parent_full: Option<&str>, name: &str) -> String {
        match parent_full {
            Some(parent) => format!("{parent}{}{name}", self.metadata.name_separator()),
            None => name.to_string(),
        }
    }

    /// Writes `code` and the order/level derived from it into `record`.
    pub(crate) fn place(&self, record: &mut Record, code: &str) -> TreeResult<()> {
        let (level, order) = self.metadata.codec().decode(code)?;
        record.set_field(self.metadata.code_field(), code);
        if let Some(field) = self.metadata.order_field() {
            record.set_field(field, order);
        }
        if let Some(field) = self.metadata.level_field() {
            record.set_field(field, level);
        }
        Ok(())
    }

    /// Copy of `record` whose segment at `level` moved by `delta`.
    pub(crate) fn shifted(&self, record: &Record, level: u32, delta: i64) -> TreeResult<Record> {
        let codec = self.metadata.codec();
        let code = self.code_of(record);
        let segment = codec.segment(code, level).ok_or_else(|| TreeError::InvalidCode {
            code: code.to_string(),
            sign_length: codec.sign_length(),
        })?;
        let moved = i64::from(segment) + delta;
        let order = u32::try_from(moved)
            .ok()
            .filter(|o| *o > 0)
            .ok_or_else(|| {
                TreeError::invalid_operation(format!("sibling order would become {moved}"))
            })?;
        let code = codec.replace_segment(code, level, order)?;
        let mut out = record.clone();
        self.place(&mut out, &code)?;
        trace!(key = %record.key(), from = self.code_of(record), to = %code, "shift");
        Ok(out)
    }

    /// Loads the stored, live version of `record`.
    pub(crate) fn reload(&self, record: &Record) -> TreeResult<Record> {
        match self.planner().find_by_key(record.key())? {
            Some(stored) if !self.is_deleted(&stored) => Ok(stored),
            _ => Err(TreeError::node_not_found(format!(
                "{} in {}",
                record.key(),
                self.metadata.table()
            ))),
        }
    }

    /// Full name of the node at `code`'s parent, or `None` at the top.
    pub(crate) fn parent_full_name(&self, code: &str) -> TreeResult<Option<String>> {
        if self.metadata.full_name_field().is_none() {
            return Ok(None);
        }
        let parent = self.metadata.codec().parent_of(code, 1);
        if parent.is_empty() {
            return Ok(None);
        }
        let record = self
            .planner()
            .find_by_code(parent)?
            .ok_or_else(|| TreeError::node_not_found(format!("parent {parent:?}")))?;
        Ok(self.full_name_of(&record))
    }

    /// Full name of `reference`'s parent, obtained by trimming the
    /// reference's own name off its full name.
    pub(crate) fn sibling_parent_full_name(
        &self,
        reference: &Record,
    ) -> TreeResult<Option<String>> {
        if self.metadata.full_name_field().is_none() {
            return Ok(None);
        }
        let code = self.code_of(reference);
        if self.metadata.codec().level(code) <= 1 {
            return Ok(None);
        }
        let name = self.name_of(reference);
        let suffix = format!("{}{name}", self.metadata.name_separator());
        match self.full_name_of(reference) {
            Some(full) if full.ends_with(&suffix) => {
                Ok(Some(full[..full.len() - suffix.len()].to_string()))
            }
            _ => self.parent_full_name(code),
        }
    }

    /// Recomputes full names of `rows` (sorted in pre-order) from the
    /// already known full names in `known`, keyed by code.
    pub(crate) fn cascade_full_names(
        &self,
        rows: &mut [Record],
        mut known: HashMap<String, String>,
    ) {
        let Some(full_field) = self.metadata.full_name_field() else {
            return;
        };
        let codec = self.metadata.codec();
        for row in rows.iter_mut() {
            let code = self.code_of(row).to_string();
            let parent = codec.parent_of(&code, 1);
            let full = self.join_names(known.get(parent).map(String::as_str), &self.name_of(row));
            row.set_field(full_field, full.as_str());
            known.insert(code, full);
        }
    }

    // ------------------------------------------------------------------
    // Write phase
    // ------------------------------------------------------------------

    pub(crate) fn plan_insert(&self, kind: MutationKind, record: Record) -> PlannedWrite {
        PlannedWrite {
            kind,
            change: ChangeArgument::created(
                record.key(),
                TreeSnapshot::capture(&self.metadata, &record),
            ),
            write: RowWrite::Insert(record),
        }
    }

    pub(crate) fn plan_update(
        &self,
        kind: MutationKind,
        before: &Record,
        after: Record,
    ) -> PlannedWrite {
        PlannedWrite {
            kind,
            change: ChangeArgument::changed(
                after.key(),
                TreeSnapshot::capture(&self.metadata, before),
                TreeSnapshot::capture(&self.metadata, &after),
            ),
            write: RowWrite::Update(after),
        }
    }

    pub(crate) fn plan_delete(
        &self,
        kind: MutationKind,
        before: &Record,
        soft: bool,
    ) -> PlannedWrite {
        PlannedWrite {
            kind,
            change: ChangeArgument::removed(
                before.key(),
                TreeSnapshot::capture(&self.metadata, before),
            ),
            write: if soft {
                RowWrite::SoftDelete
            } else {
                RowWrite::Delete
            },
        }
    }

    /// Runs the hook, writes the accepted rows in one transaction and
    /// publishes them. Returns the keys actually written.
    pub(crate) fn apply(
        &self,
        action: &str,
        writes: Vec<PlannedWrite>,
    ) -> TreeResult<Vec<RecordKey>> {
        let planned = writes.len();
        let accepted: Vec<PlannedWrite> = writes
            .into_iter()
            .filter(|w| self.accepts(w))
            .collect();
        if accepted.is_empty() {
            debug!(action, planned, "nothing to write");
            return Ok(Vec::new());
        }

        let context = format!("failed while {action}");
        self.store.begin().context(&context)?;
        if let Err(err) = self.write_rows(&accepted).and_then(|()| self.store.commit()) {
            warn!(action, error = %err, "write failed, rolling back");
            if let Err(rollback_err) = self.store.rollback() {
                warn!(action, error = %rollback_err, "rollback failed");
            }
            return Err(TreeError::storage(context, err));
        }

        let keys: Vec<RecordKey> = accepted.iter().map(|w| w.change.key).collect();
        info!(
            table = self.metadata.table(),
            action,
            rows = accepted.len(),
            vetoed = planned - accepted.len(),
            "committed"
        );
        if self.config.emit_events {
            self.feed.publish(
                self.metadata.table(),
                accepted.into_iter().map(|w| (w.kind, w.change)).collect(),
            );
        }
        Ok(keys)
    }

    fn accepts(&self, write: &PlannedWrite) -> bool {
        let Some(hook) = &self.hook else {
            return true;
        };
        let accepted = hook.before_write(&write.change, write.kind);
        if !accepted {
            warn!(key = %write.change.key, kind = %write.kind, "write vetoed by hook");
        }
        accepted
    }

    fn write_rows(&self, writes: &[PlannedWrite]) -> StoreResult<()> {
        let table = self.metadata.table();
        let mut deletes = Vec::new();
        let mut soft_deletes = Vec::new();
        for planned in writes {
            match &planned.write {
                RowWrite::Insert(record) => self.store.insert(table, record)?,
                RowWrite::Update(record) => self.store.update(table, record)?,
                RowWrite::Delete => deletes.push(planned.change.key),
                RowWrite::SoftDelete => soft_deletes.push(planned.change.key),
            }
        }
        if !deletes.is_empty() {
            self.store.bulk_delete(table, &Predicate::KeyIn(deletes))?;
        }
        if !soft_deletes.is_empty() {
            if let Some(marker) = self.metadata.delete_field() {
                let assignments = [
                    Assignment::new(marker, true),
                    Assignment::new(self.metadata.code_field(), ""),
                ];
                self.store
                    .bulk_update(table, &assignments, &Predicate::KeyIn(soft_deletes))?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TreeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEngine")
            .field("table", &self.metadata.table())
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}
