//! Integration tests for tree mutations over the catalog fixture.

use entitree_core::{EngineConfig, Position, Relation, TreeError};
use entitree_testkit::prelude::*;

fn outline(tree: &TestTree) -> Vec<(String, String)> {
    tree.outline()
        .into_iter()
        .map(|(code, name)| (name, code))
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect()
}

fn full_name(tree: &TestTree, name: &str) -> String {
    tree.named(name)
        .text("full_name")
        .unwrap_or_default()
        .to_string()
}

#[test]
fn create_appends_last_child() {
    let tree = scenarios::catalog();
    let books = tree.named("Books");
    let art = tree.child(&books, "Art");

    assert_eq!(art.text("code"), Some("00010004"));
    assert_eq!(art.int("sort_order"), Some(4));
    assert_eq!(art.int("depth"), Some(2));
    assert_eq!(art.text("full_name"), Some("Books/Art"));
    assert_eq!(art.flag("deleted"), Some(false));
    tree.assert_consistent();
}

#[test]
fn create_under_missing_parent_fails() {
    let tree = scenarios::catalog();
    let mut node = named("Lost");
    let err = tree.create(&mut node, "0009").unwrap_err();
    assert!(matches!(err, TreeError::NodeNotFound { .. }));
    assert!(err.is_pre_write());
    assert_eq!(tree.codes().len(), 7);
}

#[test]
fn insert_before_shifts_following_siblings() {
    let tree = scenarios::catalog();
    let mut drama = named("Drama");
    tree.insert(&mut drama, &tree.named("Poetry"), Position::Before)
        .unwrap();

    assert_eq!(drama.text("code"), Some("00010002"));
    assert_eq!(drama.text("full_name"), Some("Books/Drama"));
    assert_eq!(
        outline(&tree),
        pairs(&[
            ("Books", "0001"),
            ("Fiction", "00010001"),
            ("Novels", "000100010001"),
            ("Drama", "00010002"),
            ("Poetry", "00010003"),
            ("Science", "00010004"),
            ("Music", "0002"),
            ("Jazz", "00020001"),
        ])
    );
    tree.assert_consistent();
}

#[test]
fn insert_after_keeps_reference_subtree() {
    let tree = scenarios::catalog();
    let mut essays = named("Essays");
    tree.insert(&mut essays, &tree.named("Fiction"), Position::After)
        .unwrap();

    assert_eq!(essays.text("code"), Some("00010002"));
    assert_eq!(tree.named("Novels").text("code"), Some("000100010001"));
    assert_eq!(tree.named("Poetry").text("code"), Some("00010003"));
    tree.assert_consistent();
}

#[test]
fn insert_before_root() {
    let tree = scenarios::catalog();
    let mut news = named("News");
    tree.insert(&mut news, &tree.named("Books"), Position::Before)
        .unwrap();

    assert_eq!(news.text("code"), Some("0001"));
    assert_eq!(news.text("full_name"), Some("News"));
    assert_eq!(tree.named("Books").text("code"), Some("0002"));
    assert_eq!(tree.named("Novels").text("code"), Some("000200010001"));
    tree.assert_consistent();
}

#[test]
fn insert_as_child() {
    let tree = scenarios::catalog();
    let mut bebop = named("Bebop");
    tree.insert(&mut bebop, &tree.named("Jazz"), Position::Children)
        .unwrap();

    assert_eq!(bebop.text("code"), Some("000200010001"));
    assert_eq!(bebop.text("full_name"), Some("Music/Jazz/Bebop"));
    tree.assert_consistent();
}

#[test]
fn move_subtree_under_other_parent() {
    let tree = scenarios::catalog();
    let mut fiction = tree.named("Fiction");
    tree.move_node(&mut fiction, Some(&tree.named("Music")), Position::Children)
        .unwrap();

    assert_eq!(fiction.text("code"), Some("00020002"));
    assert_eq!(fiction.text("full_name"), Some("Music/Fiction"));
    assert_eq!(tree.named("Novels").text("code"), Some("000200020001"));
    assert_eq!(full_name(&tree, "Novels"), "Music/Fiction/Novels");
    assert_eq!(tree.named("Novels").int("depth"), Some(3));
    assert_eq!(tree.named("Poetry").text("code"), Some("00010001"));
    assert_eq!(tree.named("Science").text("code"), Some("00010002"));
    tree.assert_consistent();
}

#[test]
fn move_before_node_of_other_group() {
    let tree = scenarios::catalog();
    let mut jazz = tree.named("Jazz");
    tree.move_node(&mut jazz, Some(&tree.named("Poetry")), Position::Before)
        .unwrap();

    assert_eq!(jazz.text("code"), Some("00010002"));
    assert_eq!(jazz.text("full_name"), Some("Books/Jazz"));
    assert_eq!(tree.named("Poetry").text("code"), Some("00010003"));
    assert_eq!(tree.named("Science").text("code"), Some("00010004"));
    assert!(!tree.has_children(&tree.named("Music")).unwrap());
    tree.assert_consistent();
}

#[test]
fn move_after_node_of_other_group() {
    let tree = scenarios::catalog();
    let mut poetry = tree.named("Poetry");
    tree.move_node(&mut poetry, Some(&tree.named("Jazz")), Position::After)
        .unwrap();

    assert_eq!(poetry.text("code"), Some("00020002"));
    assert_eq!(poetry.text("full_name"), Some("Music/Poetry"));
    assert_eq!(tree.named("Science").text("code"), Some("00010002"));
    tree.assert_consistent();
}

#[test]
fn move_to_root() {
    let tree = scenarios::catalog();
    let mut fiction = tree.named("Fiction");
    tree.move_node(&mut fiction, None, Position::Children).unwrap();

    assert_eq!(fiction.text("code"), Some("0003"));
    assert_eq!(fiction.text("full_name"), Some("Fiction"));
    assert_eq!(fiction.int("depth"), Some(1));
    assert_eq!(tree.named("Novels").text("code"), Some("00030001"));
    assert_eq!(full_name(&tree, "Novels"), "Fiction/Novels");
    assert_eq!(tree.named("Poetry").text("code"), Some("00010001"));
    tree.assert_consistent();
}

#[test]
fn move_before_own_ancestor() {
    let tree = scenarios::catalog();
    let mut novels = tree.named("Novels");
    tree.move_node(&mut novels, Some(&tree.named("Books")), Position::Before)
        .unwrap();

    assert_eq!(
        tree.codes(),
        vec![
            "0001",
            "0002",
            "00020001",
            "00020002",
            "00020003",
            "0003",
            "00030001"
        ]
    );
    assert_eq!(novels.text("code"), Some("0001"));
    assert_eq!(novels.text("full_name"), Some("Novels"));
    assert!(!tree.has_children(&tree.named("Fiction")).unwrap());
    tree.assert_consistent();
}

#[test]
fn reorder_within_sibling_group() {
    let tree = scenarios::catalog();
    let mut fiction = tree.named("Fiction");
    tree.move_node(&mut fiction, Some(&tree.named("Science")), Position::After)
        .unwrap();

    assert_eq!(tree.named("Poetry").text("code"), Some("00010001"));
    assert_eq!(tree.named("Science").text("code"), Some("00010002"));
    assert_eq!(fiction.text("code"), Some("00010003"));
    assert_eq!(tree.named("Novels").text("code"), Some("000100030001"));
    tree.assert_consistent();

    let mut science = tree.named("Science");
    tree.move_node(&mut science, Some(&tree.named("Poetry")), Position::Before)
        .unwrap();
    assert_eq!(science.text("code"), Some("00010001"));
    assert_eq!(tree.named("Poetry").text("code"), Some("00010002"));
    assert_eq!(tree.named("Fiction").text("code"), Some("00010003"));
    tree.assert_consistent();
}

#[test]
fn move_into_own_subtree_is_rejected() {
    let tree = scenarios::catalog();
    let writes = tree.store.write_count();
    let mut books = tree.named("Books");

    let err = tree
        .move_node(&mut books, Some(&tree.named("Novels")), Position::Children)
        .unwrap_err();
    assert!(matches!(err, TreeError::IllegalMove { .. }));

    let err = tree
        .move_node(&mut books, Some(&tree.named("Fiction")), Position::Before)
        .unwrap_err();
    assert!(matches!(err, TreeError::IllegalMove { .. }));

    assert_eq!(tree.store.write_count(), writes);
    assert_eq!(tree.codes().len(), 7);
}

#[test]
fn move_next_to_itself_writes_nothing() {
    let tree = scenarios::catalog();
    let writes = tree.store.write_count();

    let mut fiction = tree.named("Fiction");
    let same = fiction.clone();
    tree.move_node(&mut fiction, Some(&same), Position::Children)
        .unwrap();
    tree.move_node(&mut fiction, Some(&tree.named("Poetry")), Position::Before)
        .unwrap();
    tree.move_node(&mut fiction, Some(&tree.named("Books")), Position::Children)
        .unwrap();
    let mut poetry = tree.named("Poetry");
    tree.move_node(&mut poetry, Some(&tree.named("Fiction")), Position::After)
        .unwrap();
    let mut music = tree.named("Music");
    tree.move_node(&mut music, None, Position::Children).unwrap();

    assert_eq!(tree.store.write_count(), writes);
    assert_eq!(fiction.text("code"), Some("00010001"));
}

#[test]
fn repeated_move_is_idempotent() {
    let tree = scenarios::catalog();
    let mut fiction = tree.named("Fiction");
    let music = tree.named("Music");
    tree.move_node(&mut fiction, Some(&music), Position::Children)
        .unwrap();
    let writes = tree.store.write_count();
    let codes = tree.codes();

    tree.move_node(&mut fiction, Some(&music), Position::Children)
        .unwrap();
    assert_eq!(tree.store.write_count(), writes);
    assert_eq!(tree.codes(), codes);
}

#[test]
fn move_up_and_down() {
    let tree = scenarios::catalog();
    let mut science = tree.named("Science");
    tree.move_up(&mut science).unwrap();
    assert_eq!(science.text("code"), Some("00010002"));
    assert_eq!(tree.named("Poetry").text("code"), Some("00010003"));

    let mut fiction = tree.named("Fiction");
    let writes = tree.store.write_count();
    tree.move_up(&mut fiction).unwrap();
    assert_eq!(tree.store.write_count(), writes);

    tree.move_down(&mut fiction).unwrap();
    assert_eq!(fiction.text("code"), Some("00010002"));
    assert_eq!(tree.named("Novels").text("code"), Some("000100020001"));
    assert_eq!(tree.named("Science").text("code"), Some("00010001"));
    tree.assert_consistent();
}

#[test]
fn remove_deletes_subtree_and_closes_gap() {
    let tree = scenarios::catalog();
    tree.remove(&tree.named("Fiction")).unwrap();

    assert_eq!(tree.store.len(CATEGORY_TABLE), 5);
    assert_eq!(tree.named("Poetry").text("code"), Some("00010001"));
    assert_eq!(tree.named("Science").text("code"), Some("00010002"));
    assert_eq!(tree.named("Science").int("sort_order"), Some(2));
    tree.assert_consistent();
}

#[test]
fn remove_root_shifts_following_roots() {
    let tree = scenarios::catalog();
    tree.remove(&tree.named("Books")).unwrap();

    assert_eq!(tree.codes(), vec!["0001", "00010001"]);
    assert_eq!(full_name(&tree, "Jazz"), "Music/Jazz");
    tree.assert_consistent();
}

#[test]
fn soft_remove_marks_rows() {
    let tree = TestTree::with_config(
        category_metadata(),
        EngineConfig::new().soft_delete(true),
    );
    scenarios::populate_catalog(&tree.engine);
    let fiction = tree.named("Fiction");
    let novels = tree.named("Novels");
    tree.remove(&fiction).unwrap();

    assert_eq!(tree.store.len(CATEGORY_TABLE), 7);
    assert_eq!(tree.codes().len(), 5);
    for key in [fiction.key(), novels.key()] {
        let row = tree.planner().find_by_key(key).unwrap().unwrap();
        assert_eq!(row.flag("deleted"), Some(true));
        assert_eq!(row.text("code"), Some(""));
        assert!(tree.get(key).unwrap().is_none());
    }
    assert_eq!(tree.named("Poetry").text("code"), Some("00010001"));
    tree.assert_consistent();

    let err = tree.remove(&fiction).unwrap_err();
    assert!(matches!(err, TreeError::NodeNotFound { .. }));
}

#[test]
fn fake_remove_without_marker_deletes() {
    let tree = scenarios::catalog_with(minimal_metadata(4));
    tree.remove_with(&tree.named("Fiction"), true).unwrap();
    assert_eq!(tree.store.len(CATEGORY_TABLE), 5);
    tree.assert_consistent();
}

#[test]
fn rename_cascades_full_names() {
    let tree = scenarios::catalog();
    let mut books = tree.named("Books").field("name", "Library");
    tree.rename(&mut books).unwrap();

    assert_eq!(books.text("full_name"), Some("Library"));
    assert_eq!(full_name(&tree, "Fiction"), "Library/Fiction");
    assert_eq!(full_name(&tree, "Novels"), "Library/Fiction/Novels");
    assert_eq!(full_name(&tree, "Jazz"), "Music/Jazz");
    tree.assert_consistent();
}

#[test]
fn rename_of_inner_node() {
    let tree = scenarios::catalog();
    let mut fiction = tree.named("Fiction").field("name", "Prose");
    tree.rename(&mut fiction).unwrap();

    assert_eq!(fiction.text("full_name"), Some("Books/Prose"));
    assert_eq!(full_name(&tree, "Novels"), "Books/Prose/Novels");
    assert_eq!(full_name(&tree, "Poetry"), "Books/Poetry");
}

#[test]
fn rename_needs_name_field() {
    let metadata = entitree_core::TreeMetadata::builder(CATEGORY_TABLE)
        .code("code")
        .build()
        .unwrap();
    let tree = TestTree::with_metadata(metadata);
    let mut node = tree.root("x");
    let err = tree.rename(&mut node).unwrap_err();
    assert!(matches!(err, TreeError::InvalidOperation { .. }));
}

#[test]
fn update_dispatches_on_changed_fields() {
    let tree = scenarios::catalog();
    let sequence = tree.feed().latest_sequence();

    let mut books = tree.named("Books").field("color", "red");
    tree.update(&mut books).unwrap();
    assert_eq!(tree.named("Books").text("color"), Some("red"));
    assert_eq!(tree.feed().latest_sequence(), sequence);

    let mut books = tree.named("Books").field("name", "Library");
    tree.update(&mut books).unwrap();
    assert_eq!(full_name(&tree, "Novels"), "Library/Fiction/Novels");
    assert_eq!(tree.named("Library").text("color"), Some("red"));

    let mut library = tree.named("Library").field("code", "0005");
    let err = tree.update(&mut library).unwrap_err();
    assert!(matches!(err, TreeError::InvalidOperation { .. }));

    let mut library = tree.named("Library").field("full_name", "bogus");
    tree.update(&mut library).unwrap();
    assert_eq!(full_name(&tree, "Library"), "Library");
    tree.assert_consistent();
}

#[test]
fn navigation_helpers() {
    let tree = scenarios::catalog();
    let books = tree.named("Books");
    let fiction = tree.named("Fiction");
    let novels = tree.named("Novels");
    let poetry = tree.named("Poetry");

    let names = |rows: Vec<Record>| -> Vec<String> {
        rows.iter()
            .map(|r| r.text("name").unwrap_or_default().to_string())
            .collect()
    };

    assert_eq!(names(tree.ancestors(&novels).unwrap()), vec!["Books", "Fiction"]);
    assert!(tree.ancestors(&books).unwrap().is_empty());
    assert_eq!(tree.parent(&novels).unwrap().unwrap().key(), fiction.key());
    assert!(tree.parent(&books).unwrap().is_none());
    assert_eq!(
        names(tree.children(&books).unwrap()),
        vec!["Fiction", "Poetry", "Science"]
    );
    assert_eq!(tree.descendants(&books).unwrap().len(), 4);
    assert_eq!(names(tree.roots().unwrap()), vec!["Books", "Music"]);
    assert!(tree.has_children(&fiction).unwrap());
    assert!(!tree.has_children(&poetry).unwrap());

    assert_eq!(
        tree.previous_sibling(&poetry).unwrap().unwrap().key(),
        fiction.key()
    );
    assert_eq!(
        names(tree.next_sibling(&poetry).unwrap().into_iter().collect()),
        vec!["Science"]
    );

    assert!(tree.is_ancestor_of(&books, &novels));
    assert!(!tree.is_ancestor_of(&novels, &books));
    assert_eq!(tree.paternal_relation(&books, &novels), Relation::Ancestor);
    assert_eq!(tree.paternal_relation(&novels, &books), Relation::Descendant);
    assert_eq!(tree.paternal_relation(&poetry, &novels), Relation::Unrelated);
    assert_eq!(tree.paternal_relation(&poetry, &poetry), Relation::Unrelated);
    assert!(tree.is_sibling(&fiction, &poetry));
    assert!(!tree.is_sibling(&fiction, &fiction));
    assert!(!tree.is_sibling(&books, &fiction));
    let short = Record::new().field("code", "12");
    assert!(!tree.is_sibling(&short, &Record::new().field("code", "34")));

    assert_eq!(tree.find_by_code("00010002").unwrap().unwrap().key(), poetry.key());
    assert!(tree.find_by_code("0009").unwrap().is_none());
}

#[test]
fn subtree_views() {
    let tree = scenarios::catalog();
    let forest = tree.subtree(None).unwrap();
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].len(), 5);
    assert_eq!(forest[1].len(), 2);

    let fiction = tree.subtree(Some(&tree.named("Fiction"))).unwrap();
    assert_eq!(fiction.len(), 1);
    assert_eq!(fiction[0].children.len(), 1);
    assert_eq!(fiction[0].children[0].record.text("name"), Some("Novels"));
}

#[test]
fn derived_order_and_level_without_stored_fields() {
    let tree = scenarios::catalog_with(minimal_metadata(4));
    let mut science = tree.named("Science");
    tree.move_node(&mut science, Some(&tree.named("Fiction")), Position::Before)
        .unwrap();

    assert_eq!(science.text("code"), Some("00010001"));
    assert_eq!(science.get_field("sort_order"), None);
    assert_eq!(tree.named("Novels").text("code"), Some("000100020001"));
    assert_eq!(
        tree.next_sibling(&science).unwrap().unwrap().text("name"),
        Some("Fiction")
    );
    tree.assert_consistent();
}
