//! Reference adjacency-list model.
//!
//! Stores the tree as explicit parent pointers and ordered child lists,
//! the obvious way, so the engine's code arithmetic can be checked
//! against it.

use entitree_core::{PathCodec, Position};
use entitree_store::RecordKey;
use std::collections::HashMap;

/// Outcome of a move applied to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMove {
    /// The node moved.
    Moved,
    /// The node was already in place.
    Unchanged,
    /// The reference lies inside the node's subtree.
    Rejected,
}

/// Adjacency-list tree keyed by record key.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTree {
    names: HashMap<RecordKey, String>,
    parents: HashMap<RecordKey, Option<RecordKey>>,
    children: HashMap<Option<RecordKey>, Vec<RecordKey>>,
}

impl ReferenceTree {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the model holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True if `key` is in the model.
    pub fn contains(&self, key: RecordKey) -> bool {
        self.names.contains_key(&key)
    }

    /// Name of `key`.
    pub fn name(&self, key: RecordKey) -> Option<&str> {
        self.names.get(&key).map(String::as_str)
    }

    /// Parent of `key`, `None` for roots.
    pub fn parent(&self, key: RecordKey) -> Option<RecordKey> {
        self.parents.get(&key).copied().flatten()
    }

    /// Appends `key` as the last child of `parent` (`None` for a root).
    pub fn add(&mut self, key: RecordKey, name: &str, parent: Option<RecordKey>) {
        self.names.insert(key, name.to_string());
        self.parents.insert(key, parent);
        self.children.entry(parent).or_default().push(key);
    }

    /// Inserts `key` relative to `reference`.
    pub fn insert(&mut self, key: RecordKey, name: &str, reference: RecordKey, position: Position) {
        if position == Position::Children {
            self.add(key, name, Some(reference));
            return;
        }
        let parent = self.parent(reference);
        self.names.insert(key, name.to_string());
        self.parents.insert(key, parent);
        self.place(key, parent, reference, position);
    }

    fn place(
        &mut self,
        key: RecordKey,
        parent: Option<RecordKey>,
        reference: RecordKey,
        position: Position,
    ) {
        let list = self.children.entry(parent).or_default();
        let at = list.iter().position(|k| *k == reference).unwrap_or(list.len());
        let at = if position == Position::After { at + 1 } else { at };
        list.insert(at.min(list.len()), key);
    }

    fn detach(&mut self, key: RecordKey) {
        let parent = self.parent(key);
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|k| *k != key);
        }
    }

    /// True if `ancestor` is a proper ancestor of `key`.
    pub fn is_ancestor(&self, ancestor: RecordKey, key: RecordKey) -> bool {
        let mut current = self.parent(key);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Moves `key` with its subtree, mirroring the engine's rules.
    pub fn move_node(
        &mut self,
        key: RecordKey,
        reference: Option<RecordKey>,
        position: Position,
    ) -> ModelMove {
        let Some(reference) = reference else {
            if self.parent(key).is_none() {
                return ModelMove::Unchanged;
            }
            self.detach(key);
            self.parents.insert(key, None);
            self.children.entry(None).or_default().push(key);
            return ModelMove::Moved;
        };
        if reference == key {
            return ModelMove::Unchanged;
        }
        if self.is_ancestor(key, reference) {
            return ModelMove::Rejected;
        }

        let before = self.shape();
        match position {
            Position::Children => {
                if self.parent(key) == Some(reference) {
                    return ModelMove::Unchanged;
                }
                self.detach(key);
                self.parents.insert(key, Some(reference));
                self.children.entry(Some(reference)).or_default().push(key);
            }
            Position::Before | Position::After => {
                let parent = self.parent(reference);
                self.detach(key);
                self.parents.insert(key, parent);
                self.place(key, parent, reference, position);
            }
        }
        if self.shape() == before {
            ModelMove::Unchanged
        } else {
            ModelMove::Moved
        }
    }

    /// Sibling right before `key`.
    pub fn previous_sibling(&self, key: RecordKey) -> Option<RecordKey> {
        let siblings = self.children.get(&self.parent(key))?;
        let at = siblings.iter().position(|k| *k == key)?;
        at.checked_sub(1).map(|i| siblings[i])
    }

    /// Sibling right after `key`.
    pub fn next_sibling(&self, key: RecordKey) -> Option<RecordKey> {
        let siblings = self.children.get(&self.parent(key))?;
        let at = siblings.iter().position(|k| *k == key)?;
        siblings.get(at + 1).copied()
    }

    /// Removes `key` and its subtree.
    pub fn remove(&mut self, key: RecordKey) {
        self.detach(key);
        let mut pending = vec![key];
        while let Some(k) = pending.pop() {
            self.names.remove(&k);
            self.parents.remove(&k);
            if let Some(kids) = self.children.remove(&Some(k)) {
                pending.extend(kids);
            }
        }
    }

    /// Renames `key`.
    pub fn rename(&mut self, key: RecordKey, name: &str) {
        if let Some(slot) = self.names.get_mut(&key) {
            *slot = name.to_string();
        }
    }

    /// Every key, depth first in sibling order.
    pub fn pre_order(&self) -> Vec<RecordKey> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<RecordKey> = self
            .children
            .get(&None)
            .map(|roots| roots.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(key) = stack.pop() {
            out.push(key);
            if let Some(kids) = self.children.get(&Some(key)) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }

    fn shape(&self) -> Vec<(RecordKey, Option<RecordKey>)> {
        self.pre_order()
            .into_iter()
            .map(|k| (k, self.parent(k)))
            .collect()
    }

    /// Ancestors of `key`, root first.
    pub fn ancestors(&self, key: RecordKey) -> Vec<RecordKey> {
        let mut out = Vec::new();
        let mut current = self.parent(key);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out.reverse();
        out
    }

    /// The code `key` should carry: the 1-based sibling index of each
    /// ancestor and of the node, each encoded with `codec`.
    pub fn expected_code(&self, key: RecordKey, codec: &PathCodec) -> String {
        let mut chain = self.ancestors(key);
        chain.push(key);
        let mut code = String::new();
        for k in chain {
            let siblings = self.children.get(&self.parent(k)).map_or(&[][..], Vec::as_slice);
            let index = siblings.iter().position(|s| *s == k).unwrap_or(0);
            code = codec
                .encode(&code, index as u32 + 1)
                .expect("Model code overflow");
        }
        code
    }

    /// The full name `key` should carry.
    pub fn expected_full_name(&self, key: RecordKey, separator: &str) -> String {
        let mut chain = self.ancestors(key);
        chain.push(key);
        chain
            .into_iter()
            .map(|k| self.name(k).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> PathCodec {
        PathCodec::new(4).unwrap()
    }

    #[test]
    fn codes_follow_sibling_positions() {
        let mut model = ReferenceTree::new();
        let (a, b, c) = (RecordKey::new(), RecordKey::new(), RecordKey::new());
        model.add(a, "a", None);
        model.add(b, "b", Some(a));
        model.insert(c, "c", b, Position::Before);
        assert_eq!(model.expected_code(c, &codec()), "00010001");
        assert_eq!(model.expected_code(b, &codec()), "00010002");
        assert_eq!(model.expected_full_name(b, "/"), "a/b");
    }

    #[test]
    fn moves_follow_engine_rules() {
        let mut model = ReferenceTree::new();
        let (a, b, c) = (RecordKey::new(), RecordKey::new(), RecordKey::new());
        model.add(a, "a", None);
        model.add(b, "b", Some(a));
        model.add(c, "c", Some(b));
        assert_eq!(model.move_node(a, Some(c), Position::Children), ModelMove::Rejected);
        assert_eq!(model.move_node(c, Some(b), Position::Children), ModelMove::Unchanged);
        assert_eq!(model.move_node(c, None, Position::Children), ModelMove::Moved);
        assert_eq!(model.expected_code(c, &codec()), "0002");
        assert_eq!(model.move_node(c, Some(a), Position::Before), ModelMove::Moved);
        assert_eq!(model.pre_order(), vec![c, a, b]);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut model = ReferenceTree::new();
        let (a, b, c) = (RecordKey::new(), RecordKey::new(), RecordKey::new());
        model.add(a, "a", None);
        model.add(b, "b", Some(a));
        model.add(c, "c", None);
        model.remove(a);
        assert_eq!(model.len(), 1);
        assert_eq!(model.expected_code(c, &codec()), "0001");
    }
}
