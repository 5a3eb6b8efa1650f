//! The JSON document a tree is kept in.
//!
//! A document is a small header (table, segment width, separator)
//! followed by a [`StoreSnapshot`] of the rows. Node fields are fixed:
//! `code`, `name`, `full_name` and the `deleted` marker. Order and level
//! are derived from the code.

use entitree_core::{
    EngineConfig, MetadataRegistry, TreeEngine, TreeError, TreeMetadata, TreeResult,
};
use entitree_store::{MemoryStore, Record, StoreError, StoreSnapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Table used when `init` is not given one.
pub const DEFAULT_TABLE: &str = "nodes";

pub const CODE: &str = "code";
pub const NAME: &str = "name";
pub const FULL_NAME: &str = "full_name";
pub const DELETED: &str = "deleted";

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// `init` would overwrite an existing file.
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    /// No document at the given path.
    #[error("no tree document at {0}")]
    Missing(PathBuf),

    /// No live node carries the code.
    #[error("no node with code {0:?}")]
    NoSuchNode(String),

    /// Bad flag combination or value.
    #[error("{0}")]
    Usage(String),

    /// The engine rejected the operation.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The document could not be parsed or written.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Table holding the nodes.
    pub table: String,
    /// Digits per tree level.
    pub sign_length: usize,
    /// Separator used in full names.
    pub separator: String,
}

impl DocumentHeader {
    fn metadata(&self) -> TreeResult<TreeMetadata> {
        TreeMetadata::builder(self.table.as_str())
            .code(CODE)
            .name(NAME)
            .full_name(FULL_NAME)
            .delete_marker(DELETED)
            .sign_length(self.sign_length)
            .name_separator(self.separator.as_str())
            .build()
    }
}

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(flatten)]
    header: DocumentHeader,
    #[serde(default)]
    store: StoreSnapshot,
}

/// An open tree document.
pub struct TreeFile {
    path: PathBuf,
    header: DocumentHeader,
    store: Arc<MemoryStore>,
    engine: TreeEngine,
}

impl TreeFile {
    /// Creates an empty document. Nothing is written until [`save`].
    ///
    /// [`save`]: TreeFile::save
    pub fn create(path: &Path, header: DocumentHeader) -> Result<Self, CliError> {
        if path.exists() {
            return Err(CliError::AlreadyExists(path.to_path_buf()));
        }
        Self::build(path, header, StoreSnapshot::default())
    }

    /// Opens an existing document.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Err(CliError::Missing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let doc: Document = serde_json::from_str(&text)?;
        Self::build(path, doc.header, doc.store)
    }

    fn build(path: &Path, header: DocumentHeader, rows: StoreSnapshot) -> Result<Self, CliError> {
        let registry = MetadataRegistry::new();
        registry.register(header.metadata()?);
        let store = Arc::new(MemoryStore::from_snapshot(rows));
        let engine = TreeEngine::from_registry(
            store.clone(),
            &registry,
            &header.table,
            EngineConfig::new().emit_events(false),
        )?;
        debug!(path = %path.display(), table = %header.table, "opened tree document");
        Ok(Self {
            path: path.to_path_buf(),
            header,
            store,
            engine,
        })
    }

    /// Writes the document back to its path.
    pub fn save(&self) -> Result<(), CliError> {
        let doc = Document {
            header: self.header.clone(),
            store: self.store.snapshot(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved tree document");
        Ok(())
    }

    pub fn engine(&self) -> &TreeEngine {
        &self.engine
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    /// The live node with `code`.
    pub fn node(&self, code: &str) -> Result<Record, CliError> {
        self.engine
            .find_by_code(code)?
            .ok_or_else(|| CliError::NoSuchNode(code.to_string()))
    }
}

/// Short label for a node: its name and code.
pub fn label(record: &Record) -> String {
    format!(
        "{} [{}]",
        record.text(NAME).unwrap_or("?"),
        record.text(CODE).unwrap_or_default()
    )
}
