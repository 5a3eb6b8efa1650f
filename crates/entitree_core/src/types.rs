//! Small shared types.

use std::fmt;
use std::str::FromStr;

/// Where a node goes relative to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Immediately before the reference, as its sibling.
    Before,
    /// Immediately after the reference, as its sibling.
    After,
    /// As the last child of the reference.
    Children,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Before => "before",
            Position::After => "after",
            Position::Children => "children",
        })
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            "children" | "child" | "under" => Ok(Position::Children),
            other => Err(format!("unknown position {other:?}")),
        }
    }
}

/// Relationship of one node to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The first node is a proper ancestor of the second.
    Ancestor,
    /// The first node is a proper descendant of the second.
    Descendant,
    /// Neither; also returned for a node compared with itself.
    Unrelated,
}
