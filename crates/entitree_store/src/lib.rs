//! # EntiTree Store
//!
//! Backing-store collaborator for EntiTree.
//!
//! This crate provides the lowest-level persistence abstraction the tree
//! engine talks to. Stores hold **flat tables of loosely typed records**;
//! they do not know what a tree is.
//!
//! ## Design Principles
//!
//! - One table per node type, one row per node
//! - Every read is a single-table predicate (no recursive queries, no joins)
//! - Writes are keyed inserts/updates or predicate-scoped bulk statements
//! - Transactions nest, and must be `Send + Sync` for shared use
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - In-memory tables with JSON snapshots
//!
//! SQL-backed stores can reuse [`sql::SqlRenderer`] to turn predicates into
//! statements for their dialect.
//!
//! ## Example
//!
//! ```rust
//! use entitree_store::{Expr, MemoryStore, Predicate, Record, TreeStore};
//!
//! let store = MemoryStore::new();
//! store.insert("nodes", &Record::new().field("code", "00010002")).unwrap();
//! let children = store
//!     .query("nodes", &Predicate::like(Expr::field("code"), "0001____"), &[])
//!     .unwrap();
//! assert_eq!(children.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod expr;
mod key;
mod memory;
mod record;
pub mod sql;
mod value;

pub use backend::TreeStore;
pub use error::{StoreError, StoreResult};
pub use expr::{compare_records, Assignment, CompareOp, Expr, OrderBy, Predicate};
pub use key::RecordKey;
pub use memory::{MemoryStore, StoreSnapshot};
pub use record::Record;
pub use value::Value;
