//! Per node type tree metadata.
//!
//! Metadata binds the logical tree fields (code, name, full name, order,
//! level, delete marker) to the field names of one table. Order and level
//! bindings are optional: when absent they are derived from the code, both
//! in memory and inside store queries.

use crate::codec::PathCodec;
use crate::error::{TreeError, TreeResult};
use entitree_store::Expr;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Default segment width.
pub const DEFAULT_SIGN_LENGTH: usize = 4;

/// Default full-name separator.
pub const DEFAULT_NAME_SEPARATOR: &str = "/";

/// Immutable description of how one node type stores its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMetadata {
    table: String,
    code_field: String,
    name_field: Option<String>,
    full_name_field: Option<String>,
    order_field: Option<String>,
    level_field: Option<String>,
    delete_field: Option<String>,
    name_separator: String,
    codec: PathCodec,
}

impl TreeMetadata {
    /// Starts a builder for the given table.
    pub fn builder(table: impl Into<String>) -> TreeMetadataBuilder {
        TreeMetadataBuilder::new(table)
    }

    /// Table holding the nodes.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field holding the inner code.
    #[must_use]
    pub fn code_field(&self) -> &str {
        &self.code_field
    }

    /// Field holding the short name, if tracked.
    #[must_use]
    pub fn name_field(&self) -> Option<&str> {
        self.name_field.as_deref()
    }

    /// Field holding the cascading full name, if tracked.
    #[must_use]
    pub fn full_name_field(&self) -> Option<&str> {
        self.full_name_field.as_deref()
    }

    /// Field holding the explicit order, if stored.
    #[must_use]
    pub fn order_field(&self) -> Option<&str> {
        self.order_field.as_deref()
    }

    /// Field holding the explicit level, if stored.
    #[must_use]
    pub fn level_field(&self) -> Option<&str> {
        self.level_field.as_deref()
    }

    /// Boolean soft-delete marker, if declared.
    #[must_use]
    pub fn delete_field(&self) -> Option<&str> {
        self.delete_field.as_deref()
    }

    /// Separator between names in a full name.
    #[must_use]
    pub fn name_separator(&self) -> &str {
        &self.name_separator
    }

    /// Segment width.
    #[must_use]
    pub fn sign_length(&self) -> usize {
        self.codec.sign_length()
    }

    /// Codec for this node type's segment width.
    #[must_use]
    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    /// Expression over the code column.
    #[must_use]
    pub fn code_expr(&self) -> Expr {
        Expr::field(self.code_field.as_str())
    }

    /// Expression yielding a row's order: the stored field, or the last
    /// segment of the code cast to an integer.
    #[must_use]
    pub fn order_expr(&self) -> Expr {
        match &self.order_field {
            Some(field) => Expr::field(field.as_str()),
            None => self.code_expr().right(self.sign_length()).cast_int(),
        }
    }

    /// Expression yielding a row's level: the stored field, or the code
    /// length divided by the segment width.
    #[must_use]
    pub fn level_expr(&self) -> Expr {
        match &self.level_field {
            Some(field) => Expr::field(field.as_str()),
            None => self.code_expr().length().div(self.sign_length() as i64),
        }
    }

    /// Expression yielding the order of a row's ancestor-or-self at `level`.
    #[must_use]
    pub fn segment_expr(&self, level: u32) -> Expr {
        let start = (level.saturating_sub(1) as usize) * self.sign_length();
        self.code_expr()
            .substring(start, self.sign_length())
            .cast_int()
    }
}

/// Builder for [`TreeMetadata`].
#[derive(Debug, Clone)]
pub struct TreeMetadataBuilder {
    table: String,
    code_field: Option<String>,
    name_field: Option<String>,
    full_name_field: Option<String>,
    order_field: Option<String>,
    level_field: Option<String>,
    delete_field: Option<String>,
    name_separator: String,
    sign_length: usize,
}

impl TreeMetadataBuilder {
    /// Creates a builder with default width and separator.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            code_field: None,
            name_field: None,
            full_name_field: None,
            order_field: None,
            level_field: None,
            delete_field: None,
            name_separator: DEFAULT_NAME_SEPARATOR.to_string(),
            sign_length: DEFAULT_SIGN_LENGTH,
        }
    }

    /// Binds the inner-code field. Required.
    #[must_use]
    pub fn code(mut self, field: impl Into<String>) -> Self {
        self.code_field = Some(field.into());
        self
    }

    /// Binds the name field.
    #[must_use]
    pub fn name(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }

    /// Binds the full-name field. Requires a name field.
    #[must_use]
    pub fn full_name(mut self, field: impl Into<String>) -> Self {
        self.full_name_field = Some(field.into());
        self
    }

    /// Stores order explicitly in `field`.
    #[must_use]
    pub fn order(mut self, field: impl Into<String>) -> Self {
        self.order_field = Some(field.into());
        self
    }

    /// Stores level explicitly in `field`.
    #[must_use]
    pub fn level(mut self, field: impl Into<String>) -> Self {
        self.level_field = Some(field.into());
        self
    }

    /// Declares a boolean soft-delete marker.
    #[must_use]
    pub fn delete_marker(mut self, field: impl Into<String>) -> Self {
        self.delete_field = Some(field.into());
        self
    }

    /// Sets the separator used between names in a full name.
    #[must_use]
    pub fn name_separator(mut self, separator: impl Into<String>) -> Self {
        self.name_separator = separator.into();
        self
    }

    /// Sets the segment width.
    #[must_use]
    pub fn sign_length(mut self, sign_length: usize) -> Self {
        self.sign_length = sign_length;
        self
    }

    /// Validates the bindings and builds the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::MetadataMissing`] when the table or code field
    /// is missing, a full name is tracked without a name, two bindings
    /// share a field, or the segment width is out of range.
    pub fn build(self) -> TreeResult<TreeMetadata> {
        if self.table.is_empty() {
            return Err(TreeError::metadata_missing("no table configured"));
        }
        let code_field = match self.code_field {
            Some(field) if !field.is_empty() => field,
            _ => {
                return Err(TreeError::metadata_missing(format!(
                    "no code field configured for {}",
                    self.table
                )))
            }
        };
        if self.full_name_field.is_some() && self.name_field.is_none() {
            return Err(TreeError::metadata_missing(format!(
                "full name of {} is tracked but no name field is bound",
                self.table
            )));
        }

        let mut bound: Vec<&str> = vec![code_field.as_str()];
        for field in [
            &self.name_field,
            &self.full_name_field,
            &self.order_field,
            &self.level_field,
            &self.delete_field,
        ]
        .into_iter()
        .flatten()
        {
            if field.is_empty() || bound.contains(&field.as_str()) {
                return Err(TreeError::metadata_missing(format!(
                    "field {field:?} of {} is empty or bound twice",
                    self.table
                )));
            }
            bound.push(field);
        }

        let codec = PathCodec::new(self.sign_length)
            .map_err(|e| TreeError::metadata_missing(e.to_string()))?;

        Ok(TreeMetadata {
            table: self.table,
            code_field,
            name_field: self.name_field,
            full_name_field: self.full_name_field,
            order_field: self.order_field,
            level_field: self.level_field,
            delete_field: self.delete_field,
            name_separator: self.name_separator,
            codec,
        })
    }
}

/// Registry of metadata per node type.
///
/// Applications create one registry, register every tree-shaped type at
/// startup, and hand it to whatever constructs engines.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: RwLock<HashMap<String, Arc<TreeMetadata>>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata under its table name, replacing any previous
    /// entry.
    pub fn register(&self, metadata: TreeMetadata) -> Arc<TreeMetadata> {
        let metadata = Arc::new(metadata);
        self.entries
            .write()
            .insert(metadata.table().to_string(), Arc::clone(&metadata));
        metadata
    }

    /// Looks up metadata by table name.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<Arc<TreeMetadata>> {
        self.entries.read().get(table).cloned()
    }

    /// Looks up metadata, failing when the type was never registered.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::MetadataMissing`] for unknown tables.
    pub fn require(&self, table: &str) -> TreeResult<Arc<TreeMetadata>> {
        self.get(table)
            .ok_or_else(|| TreeError::metadata_missing(format!("{table} is not registered")))
    }

    /// True if the table is registered.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.entries.read().contains_key(table)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
