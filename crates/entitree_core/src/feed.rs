//! Change feed for observing committed tree mutations.
//!
//! Every row a mutation actually wrote (hook vetoes excluded) is published
//! after the transaction commits, enabling:
//! - Audit logging
//! - Cache invalidation of rendered trees
//! - Reactive UI updates
//!
//! # Usage
//!
//! ```rust,ignore
//! let engine = TreeEngine::new(store, metadata);
//! let receiver = engine.feed().subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(event) = receiver.recv() {
//!         println!("{} {} -> {:?}", event.kind, event.change.key, event.change.after);
//!     }
//! });
//! ```

use crate::change::{ChangeArgument, MutationKind};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// A single committed row change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    /// Commit sequence; all rows of one mutation share it.
    pub sequence: u64,
    /// Table the row belongs to.
    pub table: String,
    /// Mutation the row was part of.
    pub kind: MutationKind,
    /// Before/after snapshot of the row.
    pub change: ChangeArgument,
}

/// Distributes committed tree changes to subscribers.
///
/// The feed:
/// - Emits only committed rows
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Keeps a bounded history for polling
pub struct TreeChangeFeed {
    subscribers: RwLock<Vec<Sender<TreeEvent>>>,
    history: RwLock<Vec<TreeEvent>>,
    max_history: usize,
    next_sequence: AtomicU64,
}

impl TreeChangeFeed {
    /// Creates a feed with the default history bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a feed with a specific history bound.
    #[must_use]
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<TreeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publishes the rows of one committed mutation under a fresh
    /// sequence number, which is returned. Empty batches publish nothing
    /// and return 0.
    pub fn publish(&self, table: &str, changes: Vec<(MutationKind, ChangeArgument)>) -> u64 {
        if changes.is_empty() {
            return 0;
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let events: Vec<TreeEvent> = changes
            .into_iter()
            .map(|(kind, change)| TreeEvent {
                sequence,
                table: table.to_string(),
                kind,
                change,
            })
            .collect();

        {
            let mut history = self.history.write();
            history.extend(events.iter().cloned());
            if history.len() > self.max_history {
                let to_remove = history.len() - self.max_history;
                history.drain(0..to_remove);
            }
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
        sequence
    }

    /// Returns retained events with sequence greater than `cursor`.
    pub fn events_since(&self, cursor: u64) -> Vec<TreeEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .cloned()
            .collect()
    }

    /// Latest published sequence, or 0.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map_or(0, |e| e.sequence)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Number of retained events.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for TreeChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TreeChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeChangeFeed")
            .field("latest_sequence", &self.latest_sequence())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
