//! Record identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque primary key of a stored record.
///
/// Keys are 128-bit UUIDs that are:
/// - Unique within a table
/// - Immutable once assigned
/// - Never reused
///
/// The tree engine never interprets a key; it only carries it between
/// reads and writes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(Uuid);

impl RecordKey {
    /// Creates a new random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a key from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Creates a key from a small integer, handy for fixtures.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Converts to a UUID.
    #[must_use]
    pub const fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordKey> for Uuid {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}
