//! Test fixtures and engine helpers.
//!
//! Provides engines over fresh in-memory stores and a few prepared trees.

use entitree_core::{EngineConfig, TreeEngine, TreeMetadata};
use entitree_store::{MemoryStore, Record, TreeStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Table used by the fixtures.
pub const CATEGORY_TABLE: &str = "category";

/// Metadata binding every tree field, with a delete marker.
///
/// Fields: `code`, `name`, `full_name`, `sort_order`, `depth`, `deleted`.
pub fn category_metadata() -> TreeMetadata {
    category_metadata_with_sign_length(entitree_core::DEFAULT_SIGN_LENGTH)
}

/// Same as [`category_metadata`] with a custom segment width.
pub fn category_metadata_with_sign_length(sign_length: usize) -> TreeMetadata {
    TreeMetadata::builder(CATEGORY_TABLE)
        .code("code")
        .name("name")
        .full_name("full_name")
        .order("sort_order")
        .level("depth")
        .delete_marker("deleted")
        .sign_length(sign_length)
        .build()
        .expect("Invalid fixture metadata")
}

/// Metadata with only the code and name bound; order and level are
/// derived from the code.
pub fn minimal_metadata(sign_length: usize) -> TreeMetadata {
    TreeMetadata::builder(CATEGORY_TABLE)
        .code("code")
        .name("name")
        .sign_length(sign_length)
        .build()
        .expect("Invalid fixture metadata")
}

/// A record carrying just a name.
pub fn named(name: &str) -> Record {
    Record::new().field("name", name)
}

/// Creates a new root named `name` through `engine`.
pub fn add_root(engine: &TreeEngine, name: &str) -> Record {
    let mut node = named(name);
    engine.create(&mut node, "").expect("Failed to create root");
    node
}

/// Creates `name` as the last child of `parent` through `engine`.
pub fn add_child(engine: &TreeEngine, parent: &Record, name: &str) -> Record {
    let code = parent
        .text(engine.metadata().code_field())
        .expect("Parent has no code")
        .to_string();
    let mut node = named(name);
    engine
        .create(&mut node, &code)
        .expect("Failed to create child");
    node
}

/// An engine over a fresh in-memory store.
pub struct TestTree {
    /// The engine under test.
    pub engine: TreeEngine,
    /// The store behind it, for direct inspection.
    pub store: Arc<MemoryStore>,
}

impl TestTree {
    /// Creates an empty tree with [`category_metadata`].
    pub fn memory() -> Self {
        Self::with_metadata(category_metadata())
    }

    /// Creates an empty tree with the given metadata.
    pub fn with_metadata(metadata: TreeMetadata) -> Self {
        Self::with_config(metadata, EngineConfig::default())
    }

    /// Creates an empty tree with the given metadata and configuration.
    pub fn with_config(metadata: TreeMetadata, config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn TreeStore> = store.clone();
        Self {
            engine: TreeEngine::with_config(shared, metadata, config),
            store,
        }
    }

    /// Creates a new root named `name`.
    pub fn root(&self, name: &str) -> Record {
        add_root(&self.engine, name)
    }

    /// Creates `name` as the last child of `parent`.
    pub fn child(&self, parent: &Record, name: &str) -> Record {
        add_child(&self.engine, parent, name)
    }

    /// The live node called `name`. Panics if there is none.
    pub fn named(&self, name: &str) -> Record {
        self.engine
            .planner()
            .all()
            .expect("Failed to list nodes")
            .into_iter()
            .find(|r| r.text("name") == Some(name))
            .unwrap_or_else(|| panic!("No node named {name:?}"))
    }

    /// Codes of every live node, in pre-order.
    pub fn codes(&self) -> Vec<String> {
        self.outline().into_iter().map(|(code, _)| code).collect()
    }

    /// `(code, name)` of every live node, in pre-order.
    pub fn outline(&self) -> Vec<(String, String)> {
        let code_field = self.engine.metadata().code_field();
        self.engine
            .planner()
            .all()
            .expect("Failed to list nodes")
            .into_iter()
            .map(|r| {
                (
                    r.text(code_field).unwrap_or_default().to_string(),
                    r.text("name").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    /// Panics with the violations if the tree is inconsistent.
    pub fn assert_consistent(&self) {
        let report = self.engine.verify().expect("Failed to verify");
        assert!(
            report.is_ok(),
            "tree is inconsistent: {:#?}",
            report.violations
        );
    }

    /// Saves the store as a JSON snapshot in a temporary directory.
    ///
    /// The directory is removed when the returned guard drops.
    pub fn save_to_temp(&self) -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("tree.json");
        self.store.save_json(&path).expect("Failed to save snapshot");
        (dir, path)
    }
}

impl std::ops::Deref for TestTree {
    type Target = TreeEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Prepared trees.
pub mod scenarios {
    use super::*;

    /// A small catalog:
    ///
    /// ```text
    /// Books              0001
    ///   Fiction          00010001
    ///     Novels         000100010001
    ///   Poetry           00010002
    ///   Science          00010003
    /// Music              0002
    ///   Jazz             00020001
    /// ```
    pub fn catalog() -> TestTree {
        catalog_with(category_metadata())
    }

    /// The catalog tree over custom metadata.
    pub fn catalog_with(metadata: TreeMetadata) -> TestTree {
        let tree = TestTree::with_metadata(metadata);
        populate_catalog(&tree.engine);
        tree
    }

    /// Creates the catalog nodes through any engine.
    pub fn populate_catalog(engine: &TreeEngine) {
        let books = add_root(engine, "Books");
        let fiction = add_child(engine, &books, "Fiction");
        add_child(engine, &fiction, "Novels");
        add_child(engine, &books, "Poetry");
        add_child(engine, &books, "Science");
        let music = add_root(engine, "Music");
        add_child(engine, &music, "Jazz");
    }

    /// `width` roots, each with `width` children, to `depth` levels.
    pub fn uniform(width: usize, depth: usize) -> TestTree {
        let tree = TestTree::memory();
        let mut frontier: Vec<Option<Record>> = vec![None];
        for level in 0..depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for i in 0..width {
                    let name = format!("n{level}_{i}");
                    let node = match parent {
                        Some(p) => tree.child(p, &name),
                        None => tree.root(&name),
                    };
                    next.push(Some(node));
                }
            }
            frontier = next;
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_layout() {
        let tree = scenarios::catalog();
        assert_eq!(
            tree.codes(),
            vec![
                "0001",
                "00010001",
                "000100010001",
                "00010002",
                "00010003",
                "0002",
                "00020001"
            ]
        );
        assert_eq!(tree.named("Novels").text("full_name"), Some("Books/Fiction/Novels"));
        tree.assert_consistent();
    }

    #[test]
    fn uniform_size() {
        let tree = scenarios::uniform(3, 2);
        assert_eq!(tree.codes().len(), 3 + 9);
        tree.assert_consistent();
    }

    #[test]
    fn snapshot_in_temp_dir() {
        let tree = scenarios::catalog();
        let (_dir, path) = tree.save_to_temp();
        let loaded = MemoryStore::load_json(&path).unwrap();
        assert_eq!(loaded.len(CATEGORY_TABLE), 7);
    }
}
