//! Move command implementations.

use crate::document::{label, TreeFile};
use entitree_core::Position;
use std::path::Path;

/// Runs the mv command. Without a reference the node moves to the root level.
pub fn run(
    path: &Path,
    code: &str,
    to: Option<&str>,
    position: Position,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let mut node = file.node(code)?;
    let reference = to.map(|c| file.node(c)).transpose()?;

    file.engine()
        .move_node(&mut node, reference.as_ref(), position)?;
    file.save()?;

    println!("Moved {code} to {}", label(&node));
    Ok(())
}

/// Runs the up (`up = true`) or down command.
pub fn shift(path: &Path, code: &str, up: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let mut node = file.node(code)?;

    if up {
        file.engine().move_up(&mut node)?;
    } else {
        file.engine().move_down(&mut node)?;
    }
    file.save()?;

    println!("Moved {code} to {}", label(&node));
    Ok(())
}
