//! Neighbourhood queries over the code column.
//!
//! Every query here is a single-table predicate built from prefix, `LIKE`,
//! length and substring primitives. The `*_filter` methods expose the
//! predicate without running it so callers can render or log it.

use crate::error::{StoreContext, TreeResult};
use crate::metadata::TreeMetadata;
use entitree_store::{CompareOp, Expr, OrderBy, Predicate, Record, RecordKey, TreeStore};
use tracing::trace;

/// Bounds of a sibling range query.
///
/// Selects the siblings of `code` (same parent, same level) whose order is
/// after `from` (or at it, with `include_current`), optionally no later
/// than `until`, together with all of their descendants. Rows under
/// `exclude` are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingScope<'c> {
    /// Code of any node in the sibling group.
    pub code: &'c str,
    /// Lower order bound.
    pub from: u32,
    /// Whether `from` itself is included.
    pub include_current: bool,
    /// Inclusive upper order bound.
    pub until: Option<u32>,
    /// Subtree to leave out.
    pub exclude: Option<&'c str>,
}

impl<'c> SiblingScope<'c> {
    /// Siblings strictly after `order`.
    #[must_use]
    pub fn after(code: &'c str, order: u32) -> Self {
        Self {
            code,
            from: order,
            include_current: false,
            until: None,
            exclude: None,
        }
    }

    /// Siblings at or after `order`.
    #[must_use]
    pub fn at_or_after(code: &'c str, order: u32) -> Self {
        Self {
            include_current: true,
            ..Self::after(code, order)
        }
    }

    /// Stops at `order` (inclusive).
    #[must_use]
    pub fn until(mut self, order: u32) -> Self {
        self.until = Some(order);
        self
    }

    /// Leaves out the subtree rooted at `code`.
    #[must_use]
    pub fn excluding(mut self, code: &'c str) -> Self {
        self.exclude = Some(code);
        self
    }
}

/// Read-only query builder and executor for one node type.
#[derive(Clone, Copy)]
pub struct TreeQueryPlanner<'a> {
    store: &'a dyn TreeStore,
    metadata: &'a TreeMetadata,
}

impl<'a> TreeQueryPlanner<'a> {
    /// Creates a planner.
    #[must_use]
    pub fn new(store: &'a dyn TreeStore, metadata: &'a TreeMetadata) -> Self {
        Self { store, metadata }
    }

    /// Metadata the planner queries with.
    #[must_use]
    pub fn metadata(&self) -> &'a TreeMetadata {
        self.metadata
    }

    fn code(&self) -> Expr {
        self.metadata.code_expr()
    }

    /// Excludes soft-deleted rows when a delete marker is declared. Rows
    /// without a marker value are live.
    #[must_use]
    pub fn live_filter(&self) -> Predicate {
        match self.metadata.delete_field() {
            Some(field) => Predicate::is_null(Expr::field(field))
                .or(Predicate::eq(Expr::field(field), true).negate()),
            None => Predicate::All,
        }
    }

    /// Rows exactly one level below `code`.
    #[must_use]
    pub fn children_filter(&self, code: &str) -> Predicate {
        Predicate::like(self.code(), self.metadata.codec().children_pattern(code))
            .and(self.live_filter())
    }

    /// Rows any depth below `code`.
    #[must_use]
    pub fn descendants_filter(&self, code: &str) -> Predicate {
        Predicate::starts_with(self.code(), code)
            .and(Predicate::cmp(
                self.code().length(),
                CompareOp::Gt,
                code.chars().count() as i64,
            ))
            .and(self.live_filter())
    }

    /// Rows selected by a [`SiblingScope`].
    #[must_use]
    pub fn siblings_from_filter(&self, scope: &SiblingScope<'_>) -> Predicate {
        let codec = self.metadata.codec();
        let level = codec.level(scope.code);
        let parent = codec.parent_of(scope.code, 1);
        let segment = self.metadata.segment_expr(level);
        let lower = if scope.include_current {
            CompareOp::Ge
        } else {
            CompareOp::Gt
        };

        let mut filter = Predicate::starts_with(self.code(), parent)
            .and(Predicate::cmp(
                self.code().length(),
                CompareOp::Ge,
                (level as usize * codec.sign_length()) as i64,
            ))
            .and(Predicate::cmp(segment.clone(), lower, i64::from(scope.from)));
        if let Some(until) = scope.until {
            filter = filter.and(Predicate::cmp(segment, CompareOp::Le, i64::from(until)));
        }
        if let Some(exclude) = scope.exclude {
            filter = filter.and(Predicate::starts_with(self.code(), exclude).negate());
        }
        filter.and(self.live_filter())
    }

    /// Proper ancestors of `code`.
    #[must_use]
    pub fn ancestors_filter(&self, code: &str) -> Predicate {
        let codes = self
            .metadata
            .codec()
            .ancestors(code)
            .into_iter()
            .map(Into::into)
            .collect();
        Predicate::In(self.code(), codes).and(self.live_filter())
    }

    /// Every live row.
    #[must_use]
    pub fn all_filter(&self) -> Predicate {
        self.live_filter()
    }

    /// Ordering by position among siblings.
    #[must_use]
    pub fn by_order(&self) -> Vec<OrderBy> {
        vec![OrderBy::asc(self.metadata.order_expr())]
    }

    /// Pre-order (depth-first) ordering.
    #[must_use]
    pub fn by_code(&self) -> Vec<OrderBy> {
        vec![OrderBy::asc(self.code())]
    }

    fn run(&self, what: &str, filter: &Predicate, order_by: &[OrderBy]) -> TreeResult<Vec<Record>> {
        let rows = self
            .store
            .query(self.metadata.table(), filter, order_by)
            .context(&format!("failed while planning: {what}"))?;
        trace!(table = self.metadata.table(), what, rows = rows.len(), "planned query");
        Ok(rows)
    }

    /// Direct children of `code`, by order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn children(&self, code: &str) -> TreeResult<Vec<Record>> {
        self.run("children", &self.children_filter(code), &self.by_order())
    }

    /// All descendants of `code`, in pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn descendants(&self, code: &str) -> TreeResult<Vec<Record>> {
        self.run("descendants", &self.descendants_filter(code), &self.by_code())
    }

    /// Siblings in a range plus their descendants, in pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn siblings_and_descendants_from(
        &self,
        scope: &SiblingScope<'_>,
    ) -> TreeResult<Vec<Record>> {
        self.run(
            "siblings and descendants",
            &self.siblings_from_filter(scope),
            &self.by_code(),
        )
    }

    /// Ancestors of `code`, root first and immediate parent last.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn ancestors(&self, code: &str) -> TreeResult<Vec<Record>> {
        self.run(
            "ancestors",
            &self.ancestors_filter(code),
            &[OrderBy::asc(self.code().length())],
        )
    }

    /// The nearest sibling before `order`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn previous_sibling(&self, code: &str, order: u32) -> TreeResult<Option<Record>> {
        let parent = self.metadata.codec().parent_of(code, 1);
        let filter = self
            .children_filter(parent)
            .and(Predicate::cmp(self.metadata.order_expr(), CompareOp::Lt, i64::from(order)));
        let rows = self.run(
            "previous sibling",
            &filter,
            &[OrderBy::desc(self.metadata.order_expr())],
        )?;
        Ok(rows.into_iter().next())
    }

    /// The nearest sibling after `order`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn next_sibling(&self, code: &str, order: u32) -> TreeResult<Option<Record>> {
        let parent = self.metadata.codec().parent_of(code, 1);
        let filter = self
            .children_filter(parent)
            .and(Predicate::cmp(self.metadata.order_expr(), CompareOp::Gt, i64::from(order)));
        let rows = self.run("next sibling", &filter, &self.by_order())?;
        Ok(rows.into_iter().next())
    }

    /// Highest child order under `parent`, or 0 without children.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn max_order_under_parent(&self, parent: &str) -> TreeResult<u32> {
        let max = self
            .store
            .max_int(
                self.metadata.table(),
                &self.metadata.order_expr(),
                &self.children_filter(parent),
            )
            .context("failed while planning: max order")?;
        Ok(max.map_or(0, |m| u32::try_from(m).unwrap_or(0)))
    }

    /// The live row with exactly this code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn find_by_code(&self, code: &str) -> TreeResult<Option<Record>> {
        let filter = Predicate::eq(self.code(), code).and(self.live_filter());
        Ok(self.run("by code", &filter, &[])?.into_iter().next())
    }

    /// The row with this key, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn find_by_key(&self, key: RecordKey) -> TreeResult<Option<Record>> {
        Ok(self
            .run("by key", &Predicate::KeyIn(vec![key]), &[])?
            .into_iter()
            .next())
    }

    /// Every live row, in pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn all(&self) -> TreeResult<Vec<Record>> {
        self.run("all", &self.all_filter(), &self.by_code())
    }
}

impl std::fmt::Debug for TreeQueryPlanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeQueryPlanner")
            .field("table", &self.metadata.table())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitree_store::MemoryStore;

    fn meta() -> TreeMetadata {
        TreeMetadata::builder("t")
            .code("code")
            .delete_marker("deleted")
            .build()
            .unwrap()
    }

    fn seeded(codes: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for code in codes {
            store
                .insert("t", &Record::new().field("code", *code))
                .unwrap();
        }
        store
    }

    fn codes(rows: Vec<Record>) -> Vec<String> {
        rows.into_iter()
            .map(|r| r.text("code").unwrap().to_string())
            .collect()
    }

    const TREE: &[&str] = &[
        "0001", "00010001", "00010002", "000100020001", "00010003", "0002", "00020001",
    ];

    #[test]
    fn children_are_one_level_down() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        assert_eq!(
            codes(p.children("0001").unwrap()),
            vec!["00010001", "00010002", "00010003"]
        );
        assert_eq!(codes(p.children("").unwrap()), vec!["0001", "0002"]);
        assert!(p.children("00010003").unwrap().is_empty());
    }

    #[test]
    fn descendants_exclude_self() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        assert_eq!(
            codes(p.descendants("0001").unwrap()),
            vec!["00010001", "00010002", "000100020001", "00010003"]
        );
        assert_eq!(p.descendants("").unwrap().len(), TREE.len());
    }

    #[test]
    fn siblings_after_include_their_subtrees() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        let rows = p
            .siblings_and_descendants_from(&SiblingScope::after("00010001", 1))
            .unwrap();
        assert_eq!(
            codes(rows),
            vec!["00010002", "000100020001", "00010003"]
        );

        let rows = p
            .siblings_and_descendants_from(&SiblingScope::at_or_after("00010002", 2))
            .unwrap();
        assert_eq!(codes(rows), vec!["00010002", "000100020001", "00010003"]);
    }

    #[test]
    fn sibling_scope_bounds_and_exclusion() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        let rows = p
            .siblings_and_descendants_from(&SiblingScope::at_or_after("00010001", 1).until(2))
            .unwrap();
        assert_eq!(codes(rows), vec!["00010001", "00010002", "000100020001"]);

        let scope = SiblingScope::at_or_after("00010001", 1).excluding("00010002");
        let rows = p.siblings_and_descendants_from(&scope).unwrap();
        assert_eq!(codes(rows), vec!["00010001", "00010003"]);
    }

    #[test]
    fn top_level_siblings() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        let rows = p
            .siblings_and_descendants_from(&SiblingScope::after("0001", 1))
            .unwrap();
        assert_eq!(codes(rows), vec!["0002", "00020001"]);
    }

    #[test]
    fn ancestors_root_first() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        assert_eq!(
            codes(p.ancestors("000100020001").unwrap()),
            vec!["0001", "00010002"]
        );
        assert!(p.ancestors("0001").unwrap().is_empty());
    }

    #[test]
    fn neighbours_and_max_order() {
        let store = seeded(TREE);
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        let prev = p.previous_sibling("00010002", 2).unwrap().unwrap();
        assert_eq!(prev.text("code"), Some("00010001"));
        let next = p.next_sibling("00010002", 2).unwrap().unwrap();
        assert_eq!(next.text("code"), Some("00010003"));
        assert!(p.previous_sibling("00010001", 1).unwrap().is_none());
        assert!(p.next_sibling("00010003", 3).unwrap().is_none());

        assert_eq!(p.max_order_under_parent("0001").unwrap(), 3);
        assert_eq!(p.max_order_under_parent("").unwrap(), 2);
        assert_eq!(p.max_order_under_parent("00010001").unwrap(), 0);
    }

    #[test]
    fn soft_deleted_rows_are_invisible() {
        let store = seeded(TREE);
        store
            .insert(
                "t",
                &Record::new().field("code", "00010004").field("deleted", true),
            )
            .unwrap();
        let meta = meta();
        let p = TreeQueryPlanner::new(&store, &meta);
        assert_eq!(p.children("0001").unwrap().len(), 3);
        assert_eq!(p.max_order_under_parent("0001").unwrap(), 3);
        assert!(p.find_by_code("00010004").unwrap().is_none());
    }

    #[test]
    fn unmarked_rows_are_live_in_memory_and_sql() {
        use entitree_store::sql::{SqlRenderer, SqliteDialect};

        let meta = meta();
        let store = MemoryStore::new();
        let p = TreeQueryPlanner::new(&store, &meta);
        let filter = p.children_filter("");

        assert!(filter.matches(&Record::new().field("code", "0001")));
        assert!(filter.matches(&Record::new().field("code", "0002").field("deleted", false)));
        assert!(!filter.matches(&Record::new().field("code", "0003").field("deleted", true)));

        let sql = SqlRenderer::new(&SqliteDialect, "id")
            .predicate(&filter)
            .unwrap();
        assert_eq!(
            sql,
            r#"("code" LIKE '____') AND (("deleted" IS NULL) OR (NOT ("deleted" = 1)))"#
        );
    }
}
