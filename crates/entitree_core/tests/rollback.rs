//! Failure handling, the pre-write hook and the change feed.

use entitree_core::{ChangeArgument, MutationKind, TreeError, ViolationKind};
use entitree_store::StoreError;
use entitree_testkit::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn faulty_catalog() -> (Arc<FaultyStore>, TreeEngine) {
    let faulty = Arc::new(FaultyStore::new(Arc::new(MemoryStore::new())));
    let engine = TreeEngine::new(faulty.clone(), category_metadata());
    scenarios::populate_catalog(&engine);
    (faulty, engine)
}

fn find(engine: &TreeEngine, name: &str) -> Record {
    engine
        .planner()
        .all()
        .unwrap()
        .into_iter()
        .find(|r| r.text("name") == Some(name))
        .unwrap()
}

#[test]
fn failed_write_rolls_back_move() {
    let (faulty, engine) = faulty_catalog();
    let before = faulty.inner().snapshot();
    let sequence = engine.feed().latest_sequence();

    faulty.fail_after(2);
    let mut fiction = find(&engine, "Fiction");
    let err = engine
        .move_node(&mut fiction, Some(&find(&engine, "Music")), Position::Children)
        .unwrap_err();

    match &err {
        TreeError::Storage { context, source } => {
            assert_eq!(context, "failed while moving node");
            assert!(matches!(source, StoreError::Injected(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.is_pre_write());
    assert_eq!(faulty.failures(), 1);
    assert_eq!(faulty.inner().snapshot(), before);
    assert!(!faulty.inner().in_transaction());
    assert_eq!(engine.feed().latest_sequence(), sequence);

    faulty.reset();
    engine
        .move_node(&mut fiction, Some(&find(&engine, "Music")), Position::Children)
        .unwrap();
    assert!(engine.verify().unwrap().is_ok());
}

#[test]
fn failed_remove_rolls_back() {
    let (faulty, engine) = faulty_catalog();
    let before = faulty.inner().snapshot();

    // Both shifted siblings are written, then the delete fails.
    faulty.fail_after(2);
    let err = engine.remove(&find(&engine, "Fiction")).unwrap_err();
    assert!(matches!(err, TreeError::Storage { .. }));
    assert_eq!(faulty.inner().snapshot(), before);
}

#[test]
fn failed_commit_rolls_back() {
    let (faulty, engine) = faulty_catalog();
    let before = faulty.inner().snapshot();

    faulty.set_fail_on_commit(true);
    let mut books = find(&engine, "Books").field("name", "Library");
    let err = engine.rename(&mut books).unwrap_err();
    assert!(matches!(err, TreeError::Storage { .. }));
    assert_eq!(faulty.inner().snapshot(), before);
    assert!(!faulty.inner().in_transaction());
}

#[test]
fn hook_vetoes_single_rows() {
    let tree = scenarios::catalog();
    let novels = tree.named("Novels").key();
    let engine = TreeEngine::new(tree.store.clone(), category_metadata()).with_hook(
        move |change: &ChangeArgument, kind: MutationKind| {
            !(kind == MutationKind::Rename && change.key == novels)
        },
    );

    let mut books = tree.named("Books").field("name", "Library");
    engine.rename(&mut books).unwrap();

    assert_eq!(find(&engine, "Fiction").text("full_name"), Some("Library/Fiction"));
    assert_eq!(
        find(&engine, "Novels").text("full_name"),
        Some("Books/Fiction/Novels")
    );
    // Books, Fiction, Poetry and Science; Novels was vetoed.
    assert_eq!(engine.feed().events_since(0).len(), 4);

    let report = engine.verify().unwrap();
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].key, novels);
    assert_eq!(report.violations[0].kind, ViolationKind::FullNameMismatch);
}

#[test]
fn hook_can_block_creation() {
    let store = Arc::new(MemoryStore::new());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let engine = TreeEngine::new(store.clone(), category_metadata()).with_hook(
        move |change: &ChangeArgument, kind: MutationKind| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(change.before.is_none());
            kind != MutationKind::Create
        },
    );

    let mut node = named("Blocked");
    engine.create(&mut node, "").unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(store.is_empty(CATEGORY_TABLE));
    assert_eq!(node.text("code"), None);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn hook_sees_before_and_after() {
    let tree = scenarios::catalog();
    let changes: Arc<Mutex<Vec<(MutationKind, ChangeArgument)>>> = Arc::default();
    let log = Arc::clone(&changes);
    let engine = TreeEngine::new(tree.store.clone(), category_metadata()).with_hook(
        move |change: &ChangeArgument, kind: MutationKind| {
            log.lock().push((kind, change.clone()));
            true
        },
    );

    let mut fiction = tree.named("Fiction");
    engine
        .move_node(&mut fiction, Some(&tree.named("Music")), Position::Children)
        .unwrap();

    let seen = std::mem::take(&mut *changes.lock());
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|(kind, _)| *kind == MutationKind::Move));
    let (_, moved) = seen
        .iter()
        .find(|(_, c)| c.key == fiction.key())
        .unwrap();
    let before = moved.before.as_ref().unwrap();
    let after = moved.after.as_ref().unwrap();
    assert_eq!(before.code, "00010001");
    assert_eq!(after.code, "00020002");
    assert_eq!(after.full_name.as_deref(), Some("Music/Fiction"));
    assert!(moved.position_changed());
}

#[test]
fn insert_reports_shifted_siblings_as_moves() {
    let tree = scenarios::catalog();
    let changes: Arc<Mutex<Vec<(MutationKind, ChangeArgument)>>> = Arc::default();
    let log = Arc::clone(&changes);
    let engine = TreeEngine::new(tree.store.clone(), category_metadata()).with_hook(
        move |change: &ChangeArgument, kind: MutationKind| {
            log.lock().push((kind, change.clone()));
            true
        },
    );

    let mut drama = named("Drama");
    engine
        .insert(&mut drama, &tree.named("Poetry"), Position::Before)
        .unwrap();

    let seen = std::mem::take(&mut *changes.lock());
    assert_eq!(seen.len(), 3);
    let created: Vec<_> = seen
        .iter()
        .filter(|(kind, _)| *kind == MutationKind::Create)
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1.key, drama.key());
    assert!(created[0].1.before.is_none());

    let mut shifted: Vec<String> = seen
        .iter()
        .filter(|(kind, _)| *kind == MutationKind::Move)
        .map(|(_, c)| c.after.as_ref().unwrap().code.clone())
        .collect();
    shifted.sort();
    assert_eq!(shifted, vec!["00010003", "00010004"]);
}

#[test]
fn feed_reports_committed_rows() {
    let tree = scenarios::catalog();
    let rx = tree.feed().subscribe();
    let start = tree.feed().latest_sequence();

    let mut fiction = tree.named("Fiction");
    tree.move_node(&mut fiction, Some(&tree.named("Music")), Position::Children)
        .unwrap();

    let events = tree.feed().events_since(start);
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.sequence == start + 1));
    assert!(events.iter().all(|e| e.table == CATEGORY_TABLE));

    let first = rx.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(first.kind, MutationKind::Move);

    tree.remove(&tree.named("Jazz")).unwrap();
    let removed = tree.feed().events_since(start + 1);
    assert_eq!(removed.len(), 1);
    assert!(removed[0].change.after.is_none());
}

#[test]
fn events_can_be_disabled() {
    let tree = TestTree::with_config(
        category_metadata(),
        entitree_core::EngineConfig::new().emit_events(false),
    );
    scenarios::populate_catalog(&tree.engine);
    assert_eq!(tree.feed().latest_sequence(), 0);
}
