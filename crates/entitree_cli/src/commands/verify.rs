//! Verify command implementation.

use crate::document::TreeFile;
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying tree at {:?}", path);
    println!();

    let file = TreeFile::open(path)?;
    let report = file.engine().verify()?;

    println!("  Rows checked: {}", report.rows_checked);
    println!("  Violations:   {}", report.violations.len());
    for violation in report.violations.iter().take(20) {
        println!("    - {violation}");
    }
    if report.violations.len() > 20 {
        println!("    ... and {} more", report.violations.len() - 20);
    }

    println!();
    if report.is_ok() {
        println!("✓ Tree verification passed");
        Ok(())
    } else {
        println!("✗ Tree verification failed");
        Err("Verification failed".into())
    }
}
