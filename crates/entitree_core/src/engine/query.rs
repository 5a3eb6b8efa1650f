//! Read-only navigation over stored nodes.

use super::TreeEngine;
use crate::codec::PathCodec;
use crate::error::TreeResult;
use crate::types::Relation;
use entitree_store::{Record, RecordKey};

/// A node with its children, as returned by [`TreeEngine::subtree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeView {
    /// The node itself.
    pub record: Record,
    /// Direct children, by order.
    pub children: Vec<TreeView>,
}

impl TreeView {
    fn leaf(record: Record) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this view, itself included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeView::len).sum::<usize>()
    }

    /// Always false; a view holds at least its own node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Nests pre-ordered rows into views.
fn build_forest(codec: &PathCodec, code_field: &str, rows: Vec<Record>) -> Vec<TreeView> {
    fn attach(stack: &mut [(String, TreeView)], roots: &mut Vec<TreeView>, view: TreeView) {
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(view),
            None => roots.push(view),
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<(String, TreeView)> = Vec::new();
    for record in rows {
        let code = record.text(code_field).unwrap_or_default().to_string();
        loop {
            let under_top = match stack.last() {
                Some((top, _)) => codec.is_ancestor(top, &code),
                None => break,
            };
            if under_top {
                break;
            }
            if let Some((_, done)) = stack.pop() {
                attach(&mut stack, &mut roots, done);
            }
        }
        stack.push((code, TreeView::leaf(record)));
    }
    while let Some((_, done)) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }
    roots
}

impl TreeEngine {
    /// Live node with this key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn get(&self, key: RecordKey) -> TreeResult<Option<Record>> {
        Ok(self
            .planner()
            .find_by_key(key)?
            .filter(|r| !self.is_deleted(r)))
    }

    /// Live node with this code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn find_by_code(&self, code: &str) -> TreeResult<Option<Record>> {
        self.planner().find_by_code(code)
    }

    /// True if `node` has at least one live child.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn has_children(&self, node: &Record) -> TreeResult<bool> {
        let code = self.locate(node)?.code;
        Ok(self.planner().max_order_under_parent(&code)? > 0)
    }

    /// Direct children of `node`, by order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn children(&self, node: &Record) -> TreeResult<Vec<Record>> {
        self.planner().children(&self.locate(node)?.code)
    }

    /// Every node below `node`, in pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn descendants(&self, node: &Record) -> TreeResult<Vec<Record>> {
        self.planner().descendants(&self.locate(node)?.code)
    }

    /// Top-level nodes, by order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn roots(&self) -> TreeResult<Vec<Record>> {
        self.planner().children("")
    }

    /// Parent of `node`, or `None` for a root.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn parent(&self, node: &Record) -> TreeResult<Option<Record>> {
        let code = self.locate(node)?.code;
        let parent = self.metadata.codec().parent_of(&code, 1);
        if parent.is_empty() {
            return Ok(None);
        }
        self.planner().find_by_code(parent)
    }

    /// Ancestors of `node`, root first and parent last.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn ancestors(&self, node: &Record) -> TreeResult<Vec<Record>> {
        self.planner().ancestors(&self.locate(node)?.code)
    }

    /// Sibling immediately before `node`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn previous_sibling(&self, node: &Record) -> TreeResult<Option<Record>> {
        let at = self.locate(node)?;
        self.planner().previous_sibling(&at.code, at.order)
    }

    /// Sibling immediately after `node`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn next_sibling(&self, node: &Record) -> TreeResult<Option<Record>> {
        let at = self.locate(node)?;
        self.planner().next_sibling(&at.code, at.order)
    }

    /// True if `ancestor` is a proper ancestor of `node`, judged by the
    /// codes the records carry.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: &Record, node: &Record) -> bool {
        let a = self.code_of(ancestor);
        !a.is_empty() && self.metadata.codec().is_ancestor(a, self.code_of(node))
    }

    /// How `a` relates to `b`.
    #[must_use]
    pub fn paternal_relation(&self, a: &Record, b: &Record) -> Relation {
        if self.is_ancestor_of(a, b) {
            Relation::Ancestor
        } else if self.is_ancestor_of(b, a) {
            Relation::Descendant
        } else {
            Relation::Unrelated
        }
    }

    /// True if `a` and `b` are distinct nodes under the same parent.
    #[must_use]
    pub fn is_sibling(&self, a: &Record, b: &Record) -> bool {
        let (ca, cb) = (self.code_of(a), self.code_of(b));
        ca != cb && self.metadata.codec().is_sibling(ca, cb)
    }

    /// Nested view of `root` and everything below it, or of the whole
    /// tree when `root` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails.
    pub fn subtree(&self, root: Option<&Record>) -> TreeResult<Vec<TreeView>> {
        let planner = self.planner();
        let rows = match root {
            Some(node) => {
                let node = self.reload(node)?;
                let mut rows = vec![node.clone()];
                rows.extend(planner.descendants(&self.locate(&node)?.code)?);
                rows
            }
            None => planner.all()?,
        };
        Ok(build_forest(
            self.metadata.codec(),
            self.metadata.code_field(),
            rows,
        ))
    }
}
