//! Engine configuration.

/// Configuration for a [`crate::TreeEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether `remove` soft-deletes by default (needs a delete marker).
    pub soft_delete: bool,

    /// Whether committed mutations are published on the change feed.
    pub emit_events: bool,

    /// Number of events the change feed retains for polling.
    pub max_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soft_delete: false,
            emit_events: true,
            max_history: 1024,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether `remove` soft-deletes by default.
    #[must_use]
    pub const fn soft_delete(mut self, value: bool) -> Self {
        self.soft_delete = value;
        self
    }

    /// Sets whether committed mutations are published.
    #[must_use]
    pub const fn emit_events(mut self, value: bool) -> Self {
        self.emit_events = value;
        self
    }

    /// Sets the change-feed history bound.
    #[must_use]
    pub const fn max_history(mut self, value: usize) -> Self {
        self.max_history = value;
        self
    }
}
