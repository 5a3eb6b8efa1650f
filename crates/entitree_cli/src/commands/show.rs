//! Show command implementation.

use crate::document::{label, TreeFile, CODE, FULL_NAME, NAME};
use entitree_core::TreeView;
use serde::Serialize;
use std::path::Path;
use termtree::Tree;

/// One node in JSON output.
#[derive(Debug, Serialize)]
pub struct ShowNode {
    /// Inner code.
    pub code: String,
    /// Node name.
    pub name: String,
    /// Separator-joined path of names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Children, by order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ShowNode>,
}

impl From<&TreeView> for ShowNode {
    fn from(view: &TreeView) -> Self {
        Self {
            code: view.record.text(CODE).unwrap_or_default().to_string(),
            name: view.record.text(NAME).unwrap_or_default().to_string(),
            full_name: view.record.text(FULL_NAME).map(str::to_string),
            children: view.children.iter().map(ShowNode::from).collect(),
        }
    }
}

fn to_tree(view: &TreeView) -> Tree<String> {
    Tree::new(label(&view.record)).with_leaves(view.children.iter().map(to_tree))
}

/// Runs the show command.
pub fn run(
    path: &Path,
    code: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = TreeFile::open(path)?;
    let root = code.map(|c| file.node(c)).transpose()?;
    let views = file.engine().subtree(root.as_ref())?;

    match format {
        "json" => {
            let nodes: Vec<ShowNode> = views.iter().map(ShowNode::from).collect();
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        "text" => {
            if views.is_empty() {
                println!("(empty tree)");
            }
            for view in &views {
                print!("{}", to_tree(view));
            }
        }
        other => return Err(format!("Unknown format {other:?} (expected text or json)").into()),
    }
    Ok(())
}
