//! # EntiTree Core
//!
//! Materialized-path tree persistence for EntiTree.
//!
//! Each node stores a fixed-width **inner code** that concatenates the
//! zero-padded order numbers of every ancestor and of the node itself:
//! with a segment width of 4, `"00030012"` is the 12th child of the 3rd
//! root. Depth, position and ancestry all follow from the code, so every
//! structural question is answered by prefix, `LIKE`, length and substring
//! predicates over one table.
//!
//! This crate provides:
//! - [`PathCodec`] - encoding and decoding of inner codes
//! - [`TreeMetadata`] - which record fields carry tree semantics
//! - [`TreeQueryPlanner`] - neighbourhood queries over the code column
//! - [`TreeEngine`] - create, insert, move, remove and rename with subtree
//!   cascades, a pre-write hook and a change feed
//!
//! ## Example
//!
//! ```rust
//! use entitree_core::{Position, TreeEngine, TreeMetadata};
//! use entitree_store::{MemoryStore, Record};
//! use std::sync::Arc;
//!
//! let metadata = TreeMetadata::builder("menu").code("code").name("name").build().unwrap();
//! let engine = TreeEngine::new(Arc::new(MemoryStore::new()), metadata);
//!
//! let mut file = Record::new().field("name", "File");
//! let mut edit = Record::new().field("name", "Edit");
//! engine.create(&mut file, "").unwrap();
//! engine.create(&mut edit, "").unwrap();
//!
//! engine.move_node(&mut edit, Some(&file), Position::Before).unwrap();
//! assert_eq!(edit.text("code"), Some("0001"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod codec;
mod config;
mod engine;
mod error;
mod feed;
mod metadata;
mod planner;
mod types;

pub use change::{ChangeArgument, MutationKind, TreeField, TreeHook, TreeSnapshot};
pub use codec::{PathCodec, MAX_SIGN_LENGTH};
pub use config::EngineConfig;
pub use engine::{TreeEngine, TreeView, VerifyReport, Violation, ViolationKind};
pub use error::{TreeError, TreeResult};
pub use feed::{TreeChangeFeed, TreeEvent};
pub use metadata::{
    MetadataRegistry, TreeMetadata, TreeMetadataBuilder, DEFAULT_NAME_SEPARATOR,
    DEFAULT_SIGN_LENGTH,
};
pub use planner::{SiblingScope, TreeQueryPlanner};
pub use types::{Position, Relation};
