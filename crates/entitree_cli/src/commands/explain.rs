//! Explain command implementation.
//!
//! Prints, for one node, the statements a SQL-backed store would receive
//! for each planner query.

use crate::document::{CliError, TreeFile};
use entitree_core::SiblingScope;
use entitree_store::sql::{dialect_by_name, SqlRenderer};
use std::path::Path;

/// Column the rendered `KeyIn` predicates refer to.
const KEY_COLUMN: &str = "key";

/// Runs the explain command. An empty code stands for the root level.
pub fn run(path: &Path, code: &str, dialect: &str) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let dialect = dialect_by_name(dialect)
        .ok_or_else(|| CliError::Usage(format!("unknown dialect {dialect:?}")))?;
    let renderer = SqlRenderer::new(dialect.as_ref(), KEY_COLUMN);

    let engine = file.engine();
    let metadata = engine.metadata();
    let planner = engine.planner();
    let table = metadata.table();

    println!("-- dialect: {}", dialect.name());
    println!("-- children");
    println!(
        "{};",
        renderer.select(table, &planner.children_filter(code), &planner.by_order())?
    );
    println!("-- next order");
    println!(
        "{};",
        renderer.select_max(table, &metadata.order_expr(), &planner.children_filter(code))?
    );
    if code.is_empty() {
        return Ok(());
    }

    let order = metadata.codec().order(code)?;
    println!("-- descendants");
    println!(
        "{};",
        renderer.select(table, &planner.descendants_filter(code), &planner.by_code())?
    );
    println!("-- later siblings and their subtrees");
    println!(
        "{};",
        renderer.select(
            table,
            &planner.siblings_from_filter(&SiblingScope::after(code, order)),
            &planner.by_code()
        )?
    );
    println!("-- ancestors");
    println!(
        "{};",
        renderer.select(table, &planner.ancestors_filter(code), &planner.by_code())?
    );
    Ok(())
}
