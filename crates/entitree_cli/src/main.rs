//! EntiTree CLI
//!
//! Command-line tools for trees kept in a JSON document.
//!
//! # Commands
//!
//! - `init` - Create an empty tree document
//! - `add` - Add a node as a root, a child, or next to a sibling
//! - `mv` / `up` / `down` - Move a node
//! - `rm` - Remove a node and its subtree
//! - `rename` - Rename a node, cascading full names
//! - `show` - Print the tree
//! - `verify` - Check structural consistency
//! - `explain` - Print the SQL the engine would run for a node

mod commands;
mod document;

use clap::{Parser, Subcommand};
use entitree_core::Position;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// EntiTree command-line tree tools.
#[derive(Parser)]
#[command(name = "entitree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the tree document
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty tree document
    Init {
        /// Table the nodes live in
        #[arg(short, long, default_value = document::DEFAULT_TABLE)]
        table: String,

        /// Digits per tree level
        #[arg(short, long, default_value_t = entitree_core::DEFAULT_SIGN_LENGTH)]
        sign_length: usize,

        /// Separator used in full names
        #[arg(long, default_value = entitree_core::DEFAULT_NAME_SEPARATOR)]
        separator: String,
    },

    /// Add a node (as a new root unless a placement is given)
    Add {
        /// Name of the new node
        name: String,

        /// Add as the last child of this code
        #[arg(long, conflicts_with_all = ["before", "after"])]
        parent: Option<String>,

        /// Add immediately before this code
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,

        /// Add immediately after this code
        #[arg(long)]
        after: Option<String>,
    },

    /// Move a node relative to another, or to the root level
    Mv {
        /// Code of the node to move
        code: String,

        /// Code of the reference node (omit to move to the root level)
        #[arg(long)]
        to: Option<String>,

        /// Placement relative to the reference (before, after, children)
        #[arg(long, default_value = "children")]
        position: Position,
    },

    /// Swap a node with its previous sibling
    Up {
        /// Code of the node
        code: String,
    },

    /// Swap a node with its next sibling
    Down {
        /// Code of the node
        code: String,
    },

    /// Remove a node and its subtree
    Rm {
        /// Code of the node
        code: String,

        /// Mark rows as deleted instead of removing them
        #[arg(short, long)]
        soft: bool,
    },

    /// Rename a node
    Rename {
        /// Code of the node
        code: String,

        /// New name
        name: String,
    },

    /// Print the tree
    Show {
        /// Only print the subtree rooted at this code
        #[arg(short, long)]
        code: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify tree consistency
    Verify,

    /// Print the SQL the engine would run around a node
    Explain {
        /// Code of the node (omit for the root level)
        #[arg(default_value = "")]
        code: String,

        /// SQL dialect (sqlite, postgres)
        #[arg(short, long, default_value = "sqlite")]
        dialect: String,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Version = cli.command {
        println!("EntiTree CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let path = cli.path.ok_or("Tree document path required")?;

    match cli.command {
        Commands::Init {
            table,
            sign_length,
            separator,
        } => commands::init::run(&path, table, sign_length, separator)?,
        Commands::Add {
            name,
            parent,
            before,
            after,
        } => {
            let placement = match (parent, before, after) {
                (Some(code), None, None) => Some((code, Position::Children)),
                (None, Some(code), None) => Some((code, Position::Before)),
                (None, None, Some(code)) => Some((code, Position::After)),
                (None, None, None) => None,
                _ => return Err("choose at most one of --parent, --before, --after".into()),
            };
            commands::add::run(&path, &name, placement)?;
        }
        Commands::Mv { code, to, position } => {
            commands::mv::run(&path, &code, to.as_deref(), position)?;
        }
        Commands::Up { code } => commands::mv::shift(&path, &code, true)?,
        Commands::Down { code } => commands::mv::shift(&path, &code, false)?,
        Commands::Rm { code, soft } => commands::rm::run(&path, &code, soft)?,
        Commands::Rename { code, name } => commands::rename::run(&path, &code, &name)?,
        Commands::Show { code, format } => commands::show::run(&path, code.as_deref(), &format)?,
        Commands::Verify => commands::verify::run(&path)?,
        Commands::Explain { code, dialect } => commands::explain::run(&path, &code, &dialect)?,
        Commands::Version => {}
    }

    Ok(())
}
