//! Consistency checks against rows corrupted behind the engine's back.

use entitree_core::ViolationKind;
use entitree_store::Predicate;
use entitree_testkit::prelude::*;

fn drop_row(tree: &TestTree, name: &str) {
    let key = tree.named(name).key();
    tree.store
        .bulk_delete(CATEGORY_TABLE, &Predicate::KeyIn(vec![key]))
        .unwrap();
}

fn kinds(tree: &TestTree) -> Vec<(RecordKey, ViolationKind)> {
    tree.verify()
        .unwrap()
        .violations
        .into_iter()
        .map(|v| (v.key, v.kind))
        .collect()
}

#[test]
fn clean_tree_passes() {
    let tree = scenarios::catalog();
    let report = tree.verify().unwrap();
    assert!(report.is_ok());
    assert_eq!(report.rows_checked, 7);
}

#[test]
fn missing_sibling_leaves_a_gap() {
    let tree = scenarios::catalog();
    let science = tree.named("Science").key();
    drop_row(&tree, "Poetry");

    assert_eq!(kinds(&tree), vec![(science, ViolationKind::OrderGap)]);
}

#[test]
fn missing_parent_orphans_children() {
    let tree = scenarios::catalog();
    let novels = tree.named("Novels").key();
    drop_row(&tree, "Fiction");

    let found = kinds(&tree);
    assert!(found.contains(&(novels, ViolationKind::Orphan)));
    assert!(found.iter().any(|(_, k)| *k == ViolationKind::OrderGap));
}

#[test]
fn stored_fields_must_match_the_code() {
    let tree = scenarios::catalog();
    let mut jazz = tree.named("Jazz");
    jazz.set_field("sort_order", 5i64);
    jazz.set_field("depth", 1i64);
    jazz.set_field("full_name", "Jazz");
    tree.store.update(CATEGORY_TABLE, &jazz).unwrap();

    let report = tree.verify().unwrap();
    assert_eq!(report.violations.len(), 3);
    assert!(report.violations.iter().all(|v| v.key == jazz.key()));
    let found: Vec<ViolationKind> = report.violations.iter().map(|v| v.kind).collect();
    assert!(found.contains(&ViolationKind::OrderMismatch));
    assert!(found.contains(&ViolationKind::LevelMismatch));
    assert!(found.contains(&ViolationKind::FullNameMismatch));
    assert!(report.violations[0].to_string().contains("00020001"));
}

#[test]
fn malformed_and_duplicate_codes() {
    let tree = scenarios::catalog();
    let mut poetry = tree.named("Poetry");
    poetry.set_field("code", "000100");
    tree.store.update(CATEGORY_TABLE, &poetry).unwrap();
    assert!(kinds(&tree).contains(&(poetry.key(), ViolationKind::MalformedCode)));

    let mut music = tree.named("Music");
    music.set_field("code", "0001");
    tree.store.update(CATEGORY_TABLE, &music).unwrap();
    assert!(kinds(&tree)
        .iter()
        .any(|(_, k)| *k == ViolationKind::DuplicateCode));
}

#[test]
fn soft_deleted_rows_are_not_checked() {
    let tree = scenarios::catalog();
    tree.remove_with(&tree.named("Fiction"), true).unwrap();

    let report = tree.verify().unwrap();
    assert!(report.is_ok(), "{:?}", report.violations);
    assert_eq!(report.rows_checked, 5);
    assert_eq!(tree.store.len(CATEGORY_TABLE), 7);
}
