//! Property-based test generators using proptest.
//!
//! Operations address nodes by index into the current pre-order listing,
//! taken modulo its length, so every generated sequence applies to any
//! tree.

use entitree_core::Position;
use proptest::prelude::*;

/// One tree operation with positional node references.
#[derive(Debug, Clone)]
pub enum TreeOp {
    /// Create a root.
    AddRoot {
        /// Node name
        name: String,
    },
    /// Create a last child.
    AddChild {
        /// Parent index
        parent: usize,
        /// Node name
        name: String,
    },
    /// Insert next to or under a node.
    Insert {
        /// Reference index
        reference: usize,
        /// Where to insert
        position: Position,
        /// Node name
        name: String,
    },
    /// Move a node.
    Move {
        /// Node index
        node: usize,
        /// Reference index, `None` to make it a root
        reference: Option<usize>,
        /// Where to move
        position: Position,
    },
    /// Swap a node with a neighbour.
    Shift {
        /// Node index
        node: usize,
        /// Towards the first sibling
        up: bool,
    },
    /// Remove a node and its subtree.
    Remove {
        /// Node index
        node: usize,
    },
    /// Rename a node.
    Rename {
        /// Node index
        node: usize,
        /// New name
        name: String,
    },
}

/// Strategy for node names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,6}").expect("Invalid regex")
}

/// Strategy for positions.
pub fn position_strategy() -> impl Strategy<Value = Position> {
    prop_oneof![
        Just(Position::Before),
        Just(Position::After),
        Just(Position::Children),
    ]
}

/// Strategy for node indexes.
pub fn index_strategy() -> impl Strategy<Value = usize> {
    0usize..64
}

/// Strategy for a single tree operation.
pub fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        2 => name_strategy().prop_map(|name| TreeOp::AddRoot { name }),
        4 => (index_strategy(), name_strategy())
            .prop_map(|(parent, name)| TreeOp::AddChild { parent, name }),
        2 => (index_strategy(), position_strategy(), name_strategy())
            .prop_map(|(reference, position, name)| TreeOp::Insert { reference, position, name }),
        4 => (index_strategy(), prop::option::weighted(0.9, index_strategy()), position_strategy())
            .prop_map(|(node, reference, position)| TreeOp::Move { node, reference, position }),
        1 => (index_strategy(), any::<bool>()).prop_map(|(node, up)| TreeOp::Shift { node, up }),
        1 => index_strategy().prop_map(|node| TreeOp::Remove { node }),
        1 => (index_strategy(), name_strategy())
            .prop_map(|(node, name)| TreeOp::Rename { node, name }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn op_sequence_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    prop::collection::vec(tree_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
