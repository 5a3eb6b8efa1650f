//! Benchmark utilities.

use entitree_store::Record;
use entitree_testkit::TestTree;

/// A single root with `width` children, returned with the root record.
pub fn wide_tree(width: usize) -> (TestTree, Record) {
    let tree = TestTree::memory();
    let root = tree.root("root");
    for i in 0..width {
        tree.child(&root, &format!("c{i}"));
    }
    (tree, root)
}

/// A chain of `depth` nodes, each the only child of the previous one.
pub fn deep_tree(depth: usize) -> (TestTree, Record) {
    let tree = TestTree::memory();
    let top = tree.root("top");
    let mut last = top.clone();
    for i in 1..depth {
        last = tree.child(&last, &format!("d{i}"));
    }
    (tree, top)
}
