//! Model-checking harness.
//!
//! Applies the same operations to an engine and to a [`ReferenceTree`]
//! and compares the two.

use crate::fixtures::{named, TestTree};
use crate::generators::TreeOp;
use crate::model::{ModelMove, ReferenceTree};
use entitree_core::{Position, TreeError, TreeResult};
use entitree_store::{Record, RecordKey};

/// An engine paired with the model it must agree with.
pub struct ModelHarness {
    /// The engine side.
    pub tree: TestTree,
    /// The model side.
    pub model: ReferenceTree,
}

impl ModelHarness {
    /// Creates a harness over an empty [`TestTree::memory`].
    pub fn new() -> Self {
        Self::with_tree(TestTree::memory())
    }

    /// Creates a harness over an empty tree.
    pub fn with_tree(tree: TestTree) -> Self {
        Self {
            tree,
            model: ReferenceTree::new(),
        }
    }

    /// The stored version of `key`.
    pub fn record(&self, key: RecordKey) -> Record {
        self.tree
            .get(key)
            .expect("Failed to load node")
            .unwrap_or_else(|| panic!("Node {key} missing from store"))
    }

    fn pick(&self, index: usize) -> Option<RecordKey> {
        let order = self.model.pre_order();
        if order.is_empty() {
            None
        } else {
            Some(order[index % order.len()])
        }
    }

    fn add_root(&mut self, name: &str) -> TreeResult<()> {
        let mut node = named(name);
        self.tree.create(&mut node, "")?;
        self.model.add(node.key(), name, None);
        Ok(())
    }

    /// Applies `op` to both sides.
    ///
    /// Moves the model rejects must fail in the engine with
    /// [`TreeError::IllegalMove`]; moves the model finds already in place
    /// must not write.
    ///
    /// # Errors
    ///
    /// Returns whatever unexpected error the engine produced.
    pub fn apply(&mut self, op: &TreeOp) -> TreeResult<()> {
        match op {
            TreeOp::AddRoot { name } => self.add_root(name),
            TreeOp::AddChild { parent, name } => {
                let Some(parent) = self.pick(*parent) else {
                    return self.add_root(name);
                };
                let code = self.record(parent).text("code").unwrap_or_default().to_string();
                let mut node = named(name);
                self.tree.create(&mut node, &code)?;
                self.model.add(node.key(), name, Some(parent));
                Ok(())
            }
            TreeOp::Insert {
                reference,
                position,
                name,
            } => {
                let Some(reference) = self.pick(*reference) else {
                    return self.add_root(name);
                };
                let mut node = named(name);
                self.tree
                    .insert(&mut node, &self.record(reference), *position)?;
                self.model.insert(node.key(), name, reference, *position);
                Ok(())
            }
            TreeOp::Move {
                node,
                reference,
                position,
            } => {
                let Some(node) = self.pick(*node) else {
                    return Ok(());
                };
                let reference = reference.and_then(|r| self.pick(r));
                self.check_move(node, reference, *position)
            }
            TreeOp::Shift { node, up } => {
                let Some(node) = self.pick(*node) else {
                    return Ok(());
                };
                let mut record = self.record(node);
                let mut predicted = self.model.clone();
                if *up {
                    if let Some(previous) = predicted.previous_sibling(node) {
                        predicted.move_node(node, Some(previous), Position::Before);
                    }
                    self.tree.move_up(&mut record)?;
                } else {
                    if let Some(next) = predicted.next_sibling(node) {
                        predicted.move_node(node, Some(next), Position::After);
                    }
                    self.tree.move_down(&mut record)?;
                }
                self.model = predicted;
                Ok(())
            }
            TreeOp::Remove { node } => {
                let Some(node) = self.pick(*node) else {
                    return Ok(());
                };
                self.tree.remove(&self.record(node))?;
                self.model.remove(node);
                Ok(())
            }
            TreeOp::Rename { node, name } => {
                let Some(node) = self.pick(*node) else {
                    return Ok(());
                };
                let mut record = self.record(node).field("name", name.as_str());
                self.tree.rename(&mut record)?;
                self.model.rename(node, name);
                Ok(())
            }
        }
    }

    fn check_move(
        &mut self,
        node: RecordKey,
        reference: Option<RecordKey>,
        position: Position,
    ) -> TreeResult<()> {
        let mut record = self.record(node);
        let target = reference.map(|r| self.record(r));
        let writes = self.tree.store.write_count();
        let mut predicted = self.model.clone();
        let expected = predicted.move_node(node, reference, position);

        match (self.tree.move_node(&mut record, target.as_ref(), position), expected) {
            (Err(TreeError::IllegalMove { .. }), ModelMove::Rejected) => return Ok(()),
            (Err(e), _) => return Err(e),
            (Ok(()), ModelMove::Rejected) => {
                panic!("engine accepted a move into its own subtree")
            }
            (Ok(()), ModelMove::Unchanged) => assert_eq!(
                self.tree.store.write_count(),
                writes,
                "move that changes nothing wrote to the store"
            ),
            (Ok(()), ModelMove::Moved) => {}
        }
        self.model = predicted;
        Ok(())
    }

    /// Asserts that the engine's tree equals the model.
    pub fn check(&self) {
        self.tree.assert_consistent();

        let metadata = self.tree.metadata();
        let codec = metadata.codec();
        let rows = self.tree.planner().all().expect("Failed to list nodes");
        let stored: Vec<RecordKey> = rows.iter().map(Record::key).collect();
        assert_eq!(stored, self.model.pre_order(), "pre-order differs from model");

        for row in &rows {
            let key = row.key();
            assert_eq!(
                row.text("code").unwrap_or_default(),
                self.model.expected_code(key, codec),
                "code of {key}"
            );
            assert_eq!(
                row.text("full_name").map(str::to_string),
                Some(self.model.expected_full_name(key, metadata.name_separator())),
                "full name of {key}"
            );
            let ancestors: Vec<RecordKey> = self
                .tree
                .ancestors(row)
                .expect("Failed to load ancestors")
                .iter()
                .map(Record::key)
                .collect();
            assert_eq!(ancestors, self.model.ancestors(key), "ancestors of {key}");
        }
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_sequence_matches_model() {
        let mut harness = ModelHarness::new();
        let ops = [
            TreeOp::AddRoot { name: "A".into() },
            TreeOp::AddChild { parent: 0, name: "B".into() },
            TreeOp::AddChild { parent: 0, name: "C".into() },
            TreeOp::AddRoot { name: "D".into() },
            TreeOp::Move { node: 2, reference: Some(3), position: Position::Children },
            TreeOp::Move { node: 0, reference: Some(1), position: Position::Children },
            TreeOp::Shift { node: 1, up: false },
            TreeOp::Insert { reference: 1, position: Position::Before, name: "E".into() },
            TreeOp::Rename { node: 0, name: "Z".into() },
            TreeOp::Remove { node: 1 },
        ];
        for op in &ops {
            harness.apply(op).unwrap();
            harness.check();
        }
    }

    #[test]
    fn failed_moves_leave_the_model_alone() {
        let metadata = crate::fixtures::category_metadata_with_sign_length(1);
        let mut harness = ModelHarness::with_tree(TestTree::with_metadata(metadata));
        for name in ["A", "B", "C", "D", "E", "F", "G", "H", "I"] {
            harness.apply(&TreeOp::AddRoot { name: name.into() }).unwrap();
        }
        harness
            .apply(&TreeOp::AddChild { parent: 0, name: "J".into() })
            .unwrap();

        // The root level is full; J cannot join it.
        let err = harness
            .apply(&TreeOp::Move { node: 1, reference: None, position: Position::After })
            .unwrap_err();
        assert!(matches!(err, TreeError::CodeOverflow { .. }), "{err:?}");
        harness.check();

        let err = harness
            .apply(&TreeOp::Move { node: 1, reference: Some(2), position: Position::After })
            .unwrap_err();
        assert!(matches!(err, TreeError::CodeOverflow { .. }), "{err:?}");
        harness.check();
    }
}
