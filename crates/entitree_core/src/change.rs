//! Before/after snapshots of tree fields and the pre-write hook.

use crate::metadata::TreeMetadata;
use entitree_store::{Record, RecordKey};
use std::fmt;

/// Kind of tree mutation a row change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A node was created or inserted.
    Create,
    /// A name changed and full names cascaded.
    Rename,
    /// A node or one of its neighbours was repositioned.
    Move,
    /// A node was removed, or a sibling shifted to close the gap.
    Remove,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationKind::Create => "create",
            MutationKind::Rename => "rename",
            MutationKind::Move => "move",
            MutationKind::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// The tree-relevant fields of one node at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeSnapshot {
    /// Inner code.
    pub code: String,
    /// Position among siblings.
    pub order: u32,
    /// Depth.
    pub level: u32,
    /// Short name, if tracked.
    pub name: Option<String>,
    /// Full name, if tracked.
    pub full_name: Option<String>,
}

impl TreeSnapshot {
    /// Captures the tree fields of a record.
    ///
    /// Order and level come from their stored fields when bound, and are
    /// otherwise derived from the code. Malformed codes yield zeros.
    #[must_use]
    pub fn capture(metadata: &TreeMetadata, record: &Record) -> Self {
        let codec = metadata.codec();
        let code = record
            .text(metadata.code_field())
            .unwrap_or_default()
            .to_string();
        let (derived_level, derived_order) = codec.decode(&code).unwrap_or((0, 0));
        let stored = |field: Option<&str>| {
            field
                .and_then(|f| record.int(f))
                .and_then(|v| u32::try_from(v).ok())
        };
        Self {
            order: stored(metadata.order_field()).unwrap_or(derived_order),
            level: stored(metadata.level_field()).unwrap_or(derived_level),
            name: metadata
                .name_field()
                .and_then(|f| record.text(f))
                .map(str::to_string),
            full_name: metadata
                .full_name_field()
                .and_then(|f| record.text(f))
                .map(str::to_string),
            code,
        }
    }
}

/// One field that differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeField {
    /// Inner code.
    Code,
    /// Order.
    Order,
    /// Level.
    Level,
    /// Name.
    Name,
    /// Full name.
    FullName,
}

/// Before/after pair for one node touched by a mutation.
///
/// `before` is `None` for creations, `after` is `None` for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeArgument {
    /// Key of the affected row.
    pub key: RecordKey,
    /// State before the mutation.
    pub before: Option<TreeSnapshot>,
    /// State after the mutation.
    pub after: Option<TreeSnapshot>,
}

impl ChangeArgument {
    /// A row that did not exist before.
    #[must_use]
    pub fn created(key: RecordKey, after: TreeSnapshot) -> Self {
        Self {
            key,
            before: None,
            after: Some(after),
        }
    }

    /// A row that changed.
    #[must_use]
    pub fn changed(key: RecordKey, before: TreeSnapshot, after: TreeSnapshot) -> Self {
        Self {
            key,
            before: Some(before),
            after: Some(after),
        }
    }

    /// A row that goes away.
    #[must_use]
    pub fn removed(key: RecordKey, before: TreeSnapshot) -> Self {
        Self {
            key,
            before: Some(before),
            after: None,
        }
    }

    /// Fields that differ. Creations and deletions report every field.
    #[must_use]
    pub fn diff(&self) -> Vec<TreeField> {
        let (Some(before), Some(after)) = (&self.before, &self.after) else {
            return vec![
                TreeField::Code,
                TreeField::Order,
                TreeField::Level,
                TreeField::Name,
                TreeField::FullName,
            ];
        };
        let mut fields = Vec::new();
        if before.code != after.code {
            fields.push(TreeField::Code);
        }
        if before.order != after.order {
            fields.push(TreeField::Order);
        }
        if before.level != after.level {
            fields.push(TreeField::Level);
        }
        if before.name != after.name {
            fields.push(TreeField::Name);
        }
        if before.full_name != after.full_name {
            fields.push(TreeField::FullName);
        }
        fields
    }

    /// True if anything differs.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.diff().is_empty()
    }

    /// True if code, order or level differ.
    #[must_use]
    pub fn position_changed(&self) -> bool {
        self.diff()
            .iter()
            .any(|f| matches!(f, TreeField::Code | TreeField::Order | TreeField::Level))
    }

    /// True if the short name differs.
    #[must_use]
    pub fn name_changed(&self) -> bool {
        self.diff().contains(&TreeField::Name)
    }
}

/// Observer invoked once per affected row before it is written.
///
/// Returning `false` vetoes the write of that single row; the rest of the
/// batch proceeds.
pub trait TreeHook: Send + Sync {
    /// Decides whether `change` may be written.
    fn before_write(&self, change: &ChangeArgument, kind: MutationKind) -> bool;
}

impl<F> TreeHook for F
where
    F: Fn(&ChangeArgument, MutationKind) -> bool + Send + Sync,
{
    fn before_write(&self, change: &ChangeArgument, kind: MutationKind) -> bool {
        self(change, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TreeMetadata {
        TreeMetadata::builder("t")
            .code("code")
            .name("name")
            .full_name("full")
            .build()
            .unwrap()
    }

    fn snap(code: &str, name: &str) -> TreeSnapshot {
        TreeSnapshot::capture(
            &meta(),
            &Record::new().field("code", code).field("name", name),
        )
    }

    #[test]
    fn capture_derives_order_and_level() {
        let s = snap("00020005", "Books");
        assert_eq!(s.order, 5);
        assert_eq!(s.level, 2);
        assert_eq!(s.name.as_deref(), Some("Books"));
        assert_eq!(s.full_name, None);
    }

    #[test]
    fn capture_prefers_stored_fields() {
        let meta = TreeMetadata::builder("t")
            .code("code")
            .order("ord")
            .build()
            .unwrap();
        let record = Record::new().field("code", "0003").field("ord", 8i64);
        let s = TreeSnapshot::capture(&meta, &record);
        assert_eq!(s.order, 8);
    }

    #[test]
    fn diff_reports_changed_fields() {
        let key = RecordKey::new();
        let arg = ChangeArgument::changed(key, snap("0001", "a"), snap("0002", "a"));
        assert_eq!(arg.diff(), vec![TreeField::Code, TreeField::Order]);
        assert!(arg.position_changed());
        assert!(!arg.name_changed());

        let arg = ChangeArgument::changed(key, snap("0001", "a"), snap("0001", "b"));
        assert!(arg.name_changed());
        assert!(!arg.position_changed());

        let arg = ChangeArgument::changed(key, snap("0001", "a"), snap("0001", "a"));
        assert!(!arg.is_changed());
    }

    #[test]
    fn creation_reports_everything() {
        let arg = ChangeArgument::created(RecordKey::new(), snap("0001", "a"));
        assert_eq!(arg.diff().len(), 5);
    }

    #[test]
    fn closures_are_hooks() {
        let hook = |change: &ChangeArgument, kind: MutationKind| {
            kind != MutationKind::Remove || change.before.is_none()
        };
        let arg = ChangeArgument::removed(RecordKey::new(), snap("0001", "a"));
        assert!(!hook.before_write(&arg, MutationKind::Remove));
        assert!(hook.before_write(&arg, MutationKind::Move));
    }
}
