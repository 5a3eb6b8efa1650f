//! Init command implementation.

use crate::document::{DocumentHeader, TreeFile};
use std::path::Path;

/// Runs the init command.
pub fn run(
    path: &Path,
    table: String,
    sign_length: usize,
    separator: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let header = DocumentHeader {
        table,
        sign_length,
        separator,
    };
    let file = TreeFile::create(path, header)?;
    file.save()?;

    let header = file.header();
    println!(
        "Created {} (table {:?}, {} digits per level, separator {:?})",
        path.display(),
        header.table,
        header.sign_length,
        header.separator
    );
    Ok(())
}
