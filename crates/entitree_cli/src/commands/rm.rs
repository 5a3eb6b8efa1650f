//! Remove command implementation.

use crate::document::{label, TreeFile};
use std::path::Path;

/// Runs the rm command.
pub fn run(path: &Path, code: &str, soft: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let engine = file.engine();
    let node = file.node(code)?;
    let count = 1 + engine.descendants(&node)?.len();

    engine.remove_with(&node, soft)?;
    file.save()?;

    println!(
        "{} {} ({} node{})",
        if soft { "Marked deleted" } else { "Removed" },
        label(&node),
        count,
        if count == 1 { "" } else { "s" }
    );
    Ok(())
}
