//! Rename command implementation.

use crate::document::{TreeFile, FULL_NAME, NAME};
use std::path::Path;

/// Runs the rename command.
pub fn run(path: &Path, code: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let mut node = file.node(code)?;
    let below = file.engine().descendants(&node)?.len();

    node.set_field(NAME, name);
    file.engine().rename(&mut node)?;
    file.save()?;

    println!(
        "Renamed {code} to {} ({below} descendant full names updated)",
        node.text(FULL_NAME).unwrap_or(name)
    );
    Ok(())
}
