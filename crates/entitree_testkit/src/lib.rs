//! # EntiTree Testkit
//!
//! Test utilities for EntiTree.
//!
//! This crate provides:
//! - Test fixtures: engines over in-memory stores and sample trees
//! - A reference adjacency-list model and a harness that checks the
//!   engine against it
//! - Property-based test generators using proptest
//! - A fault-injecting store for rollback tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entitree_testkit::prelude::*;
//!
//! #[test]
//! fn moves_keep_the_tree_consistent() {
//!     let tree = scenarios::catalog();
//!     let mut poetry = tree.named("Poetry");
//!     tree.move_node(&mut poetry, None, Position::Children).unwrap();
//!     tree.assert_consistent();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod model;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use crate::model::*;
    pub use entitree_core::{Position, TreeEngine, TreeError};
    pub use entitree_store::{MemoryStore, Record, RecordKey, TreeStore};
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;
pub use model::*;
