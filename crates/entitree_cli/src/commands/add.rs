//! Add command implementation.

use crate::document::{TreeFile, CODE, FULL_NAME, NAME};
use entitree_core::Position;
use entitree_store::Record;
use std::path::Path;

/// Runs the add command.
///
/// Without a placement the node becomes the last root.
pub fn run(
    path: &Path,
    name: &str,
    placement: Option<(String, Position)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let engine = file.engine();
    let mut node = Record::new().field(NAME, name);

    match placement {
        Some((code, position)) => {
            let reference = file.node(&code)?;
            engine.insert(&mut node, &reference, position)?;
        }
        None => engine.create(&mut node, "")?,
    }
    file.save()?;

    println!(
        "Added {} as {}",
        node.text(FULL_NAME).unwrap_or(name),
        node.text(CODE).unwrap_or_default()
    );
    Ok(())
}
