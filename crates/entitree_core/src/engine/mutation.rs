//! Create, insert, move, remove, rename and update.

use super::{NodePos, PlannedWrite, TreeEngine};
use crate::change::{ChangeArgument, MutationKind, TreeSnapshot};
use crate::error::{StoreContext, TreeError, TreeResult};
use crate::planner::SiblingScope;
use crate::types::Position;
use entitree_store::{Record, RecordKey};
use std::collections::HashMap;
use tracing::{debug, info_span};

/// Rows touched by a move, latest version first, originals kept for the
/// before snapshots.
#[derive(Default)]
struct MoveSet {
    order: Vec<RecordKey>,
    original: HashMap<RecordKey, Record>,
    current: HashMap<RecordKey, Record>,
}

impl MoveSet {
    fn latest<'r>(&'r self, record: &'r Record) -> &'r Record {
        self.current.get(&record.key()).unwrap_or(record)
    }

    fn put(&mut self, original: &Record, updated: Record) {
        let key = original.key();
        if !self.original.contains_key(&key) {
            self.order.push(key);
            self.original.insert(key, original.clone());
        }
        self.current.insert(key, updated);
    }
}

impl TreeEngine {
    /// Creates `node` as the last child of `parent_code` (`""` for a root).
    ///
    /// On success `node` carries its new code, order, level and full name.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `parent_code` names no live node.
    /// - [`TreeError::CodeOverflow`] if the parent already has the maximum
    ///   number of children.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn create(&self, node: &mut Record, parent_code: &str) -> TreeResult<()> {
        let _span =
            info_span!("create", table = self.metadata.table(), key = %node.key()).entered();
        let planner = self.planner();
        let parent_full = if parent_code.is_empty() {
            None
        } else {
            self.metadata.codec().validate(parent_code)?;
            let parent = planner.find_by_code(parent_code)?.ok_or_else(|| {
                TreeError::node_not_found(format!("parent {parent_code:?}"))
            })?;
            self.full_name_of(&parent)
        };

        let order = planner.max_order_under_parent(parent_code)? + 1;
        let code = self.metadata.codec().encode(parent_code, order)?;
        let planned = self.prepare_new(node, &code, parent_full.as_deref())?;
        debug!(code = %code, "planned create");

        let write = self.plan_insert(MutationKind::Create, planned.clone());
        if self.apply("creating node", vec![write])?.contains(&planned.key()) {
            *node = planned;
        }
        Ok(())
    }

    /// Inserts a new `node` relative to an existing `reference`.
    ///
    /// `Before` and `After` shift the following siblings (and their
    /// subtrees) up by one before the node is inserted into the gap.
    /// `Children` appends it as the reference's last child.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `reference` is not stored.
    /// - [`TreeError::CodeOverflow`] if the sibling group is full.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn insert(
        &self,
        node: &mut Record,
        reference: &Record,
        position: Position,
    ) -> TreeResult<()> {
        let reference = self.reload(reference)?;
        let at = self.locate(&reference)?;
        if position == Position::Children {
            return self.create(node, &at.code);
        }

        let _span = info_span!(
            "insert",
            table = self.metadata.table(),
            key = %node.key(),
            reference = %at.code,
            %position
        )
        .entered();
        let codec = self.metadata.codec();
        let (order, scope) = match position {
            Position::Before => (at.order, SiblingScope::at_or_after(&at.code, at.order)),
            _ => (at.order + 1, SiblingScope::after(&at.code, at.order)),
        };
        let code = codec.encode(codec.parent_of(&at.code, 1), order)?;
        let parent_full = self.sibling_parent_full_name(&reference)?;

        let mut writes = Vec::new();
        for row in self.planner().siblings_and_descendants_from(&scope)? {
            let shifted = self.shifted(&row, at.level, 1)?;
            writes.push(self.plan_update(MutationKind::Move, &row, shifted));
        }
        let planned = self.prepare_new(node, &code, parent_full.as_deref())?;
        debug!(code = %code, shifted = writes.len(), "planned insert");
        writes.push(self.plan_insert(MutationKind::Create, planned.clone()));

        if self.apply("inserting node", writes)?.contains(&planned.key()) {
            *node = planned;
        }
        Ok(())
    }

    fn prepare_new(
        &self,
        node: &Record,
        code: &str,
        parent_full: Option<&str>,
    ) -> TreeResult<Record> {
        let mut planned = node.clone();
        self.place(&mut planned, code)?;
        if let Some(field) = self.metadata.full_name_field() {
            let full = self.join_names(parent_full, &self.name_of(node));
            planned.set_field(field, full.as_str());
        }
        if let Some(field) = self.metadata.delete_field() {
            planned.set_field(field, false);
        }
        Ok(planned)
    }

    /// Moves `node` with its whole subtree.
    ///
    /// With no reference the node becomes the last root. Otherwise it goes
    /// before or after `reference` as its sibling, or under it as the last
    /// child. The old sibling group is closed up and the new one opened,
    /// so orders stay contiguous on both sides. Moves that would leave the
    /// node where it already is write nothing.
    ///
    /// On success `node` carries its stored state.
    ///
    /// # Errors
    ///
    /// - [`TreeError::IllegalMove`] if `reference` is inside `node`'s subtree.
    /// - [`TreeError::NodeNotFound`] if either node is not stored.
    /// - [`TreeError::CodeOverflow`] if the destination group is full.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn move_node(
        &self,
        node: &mut Record,
        reference: Option<&Record>,
        position: Position,
    ) -> TreeResult<()> {
        let _span = info_span!("move", table = self.metadata.table(), key = %node.key(), %position)
            .entered();
        let current = self.reload(node)?;
        let src = self.locate(&current)?;
        let target = match reference {
            Some(r) => Some(self.reload(r)?),
            None => None,
        };

        let writes = match &target {
            None => self.plan_move_to_root(&current, &src)?,
            Some(target) => {
                if target.key() == current.key() {
                    debug!("reference is the node itself");
                    Vec::new()
                } else {
                    let dst = self.locate(target)?;
                    if self.metadata.codec().is_ancestor(&src.code, &dst.code) {
                        return Err(TreeError::illegal_move(format!(
                            "{} cannot move into its own subtree at {}",
                            src.code, dst.code
                        )));
                    }
                    self.plan_move_relative(&current, &src, target, &dst, position)?
                }
            }
        };

        if writes.is_empty() {
            debug!("already in place");
            *node = current;
            return Ok(());
        }
        self.apply("moving node", writes)?;
        *node = self.reload(&current)?;
        Ok(())
    }

    fn plan_move_to_root(&self, node: &Record, src: &NodePos) -> TreeResult<Vec<PlannedWrite>> {
        if src.level == 1 {
            return Ok(Vec::new());
        }
        let mut set = self.close_gap(src)?;
        let order = self.planner().max_order_under_parent("")? + 1;
        let code = self.metadata.codec().encode("", order)?;
        self.relocate(&mut set, node, src, &code, None)?;
        Ok(self.finish_move(set))
    }

    fn plan_move_relative(
        &self,
        node: &Record,
        src: &NodePos,
        target: &Record,
        dst: &NodePos,
        position: Position,
    ) -> TreeResult<Vec<PlannedWrite>> {
        let codec = self.metadata.codec();
        let src_parent = codec.parent_of(&src.code, 1);

        if position == Position::Children {
            if src_parent == dst.code {
                return Ok(Vec::new());
            }
            let mut set = self.close_gap(src)?;
            let order = self.planner().max_order_under_parent(&dst.code)? + 1;
            let parent_code = self.code_of(set.latest(target)).to_string();
            let code = codec.encode(&parent_code, order)?;
            let parent_full = self.full_name_of(target);
            self.relocate(&mut set, node, src, &code, parent_full.as_deref())?;
            return Ok(self.finish_move(set));
        }

        if codec.is_sibling(&src.code, &dst.code) {
            return self.plan_reorder(node, src, dst, position);
        }

        let mut set = self.close_gap(src)?;
        let (order, scope) = match position {
            Position::Before => (dst.order, SiblingScope::at_or_after(&dst.code, dst.order)),
            _ => (dst.order + 1, SiblingScope::after(&dst.code, dst.order)),
        };
        for row in self
            .planner()
            .siblings_and_descendants_from(&scope.excluding(&src.code))?
        {
            let shifted = self.shifted(set.latest(&row), dst.level, 1)?;
            set.put(&row, shifted);
        }
        let target_code = self.code_of(set.latest(target)).to_string();
        let code = codec.encode(codec.parent_of(&target_code, 1), order)?;
        let parent_full = self.sibling_parent_full_name(target)?;
        self.relocate(&mut set, node, src, &code, parent_full.as_deref())?;
        Ok(self.finish_move(set))
    }

    /// Reordering inside one sibling group: only the siblings between the
    /// old and the new slot shift, by one, towards the vacated slot.
    fn plan_reorder(
        &self,
        node: &Record,
        src: &NodePos,
        dst: &NodePos,
        position: Position,
    ) -> TreeResult<Vec<PlannedWrite>> {
        let base = if dst.order > src.order {
            dst.order - 1
        } else {
            dst.order
        };
        let slot = match position {
            Position::Before => base,
            _ => base + 1,
        };
        if slot == src.order {
            return Ok(Vec::new());
        }

        let (scope, delta) = if slot < src.order {
            (SiblingScope::at_or_after(&src.code, slot).until(src.order - 1), 1)
        } else {
            (SiblingScope::after(&src.code, src.order).until(slot), -1)
        };
        let mut set = MoveSet::default();
        for row in self.planner().siblings_and_descendants_from(&scope)? {
            let shifted = self.shifted(&row, src.level, delta)?;
            set.put(&row, shifted);
        }
        let codec = self.metadata.codec();
        let code = codec.encode(codec.parent_of(&src.code, 1), slot)?;
        let parent_full = self.sibling_parent_full_name(node)?;
        self.relocate(&mut set, node, src, &code, parent_full.as_deref())?;
        Ok(self.finish_move(set))
    }

    /// Shifts the siblings after `src` (and their subtrees) down by one.
    fn close_gap(&self, src: &NodePos) -> TreeResult<MoveSet> {
        let mut set = MoveSet::default();
        for row in self
            .planner()
            .siblings_and_descendants_from(&SiblingScope::after(&src.code, src.order))?
        {
            let shifted = self.shifted(&row, src.level, -1)?;
            set.put(&row, shifted);
        }
        Ok(set)
    }

    /// Gives `node` the code `code` and rebases its subtree under it.
    fn relocate(
        &self,
        set: &mut MoveSet,
        node: &Record,
        src: &NodePos,
        code: &str,
        parent_full: Option<&str>,
    ) -> TreeResult<()> {
        let codec = self.metadata.codec();
        let mut moved = node.clone();
        self.place(&mut moved, code)?;
        let node_full = self.join_names(parent_full, &self.name_of(node));
        if let Some(field) = self.metadata.full_name_field() {
            moved.set_field(field, node_full.as_str());
        }

        let descendants = self.planner().descendants(&src.code)?;
        let mut rebased = Vec::with_capacity(descendants.len());
        for row in &descendants {
            let mut copy = row.clone();
            self.place(&mut copy, &codec.rebase(self.code_of(row), &src.code, code))?;
            rebased.push(copy);
        }
        let mut known = HashMap::new();
        known.insert(code.to_string(), node_full);
        self.cascade_full_names(&mut rebased, known);

        set.put(node, moved);
        for (original, updated) in descendants.iter().zip(rebased) {
            set.put(original, updated);
        }
        Ok(())
    }

    fn finish_move(&self, mut set: MoveSet) -> Vec<PlannedWrite> {
        set.order
            .iter()
            .filter_map(|key| {
                let before = set.original.get(key)?;
                let after = set.current.remove(key)?;
                Some(self.plan_update(MutationKind::Move, before, after))
            })
            .collect()
    }

    /// Swaps `node` with its previous sibling. No-op for the first child.
    ///
    /// # Errors
    ///
    /// Same as [`TreeEngine::move_node`].
    pub fn move_up(&self, node: &mut Record) -> TreeResult<()> {
        let current = self.reload(node)?;
        let at = self.locate(&current)?;
        match self.planner().previous_sibling(&at.code, at.order)? {
            Some(previous) => self.move_node(node, Some(&previous), Position::Before),
            None => {
                *node = current;
                Ok(())
            }
        }
    }

    /// Swaps `node` with its next sibling. No-op for the last child.
    ///
    /// # Errors
    ///
    /// Same as [`TreeEngine::move_node`].
    pub fn move_down(&self, node: &mut Record) -> TreeResult<()> {
        let current = self.reload(node)?;
        let at = self.locate(&current)?;
        match self.planner().next_sibling(&at.code, at.order)? {
            Some(next) => self.move_node(node, Some(&next), Position::After),
            None => {
                *node = current;
                Ok(())
            }
        }
    }

    /// Removes `node` and its subtree using the configured delete mode.
    ///
    /// # Errors
    ///
    /// See [`TreeEngine::remove_with`].
    pub fn remove(&self, node: &Record) -> TreeResult<()> {
        self.remove_with(node, self.config.soft_delete)
    }

    /// Removes `node` and its subtree, then closes the gap among the
    /// following siblings.
    ///
    /// With `fake` and a declared delete marker the rows are marked
    /// deleted and their codes cleared; otherwise they are deleted.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `node` is not stored.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn remove_with(&self, node: &Record, fake: bool) -> TreeResult<()> {
        let _span = info_span!("remove", table = self.metadata.table(), key = %node.key(), fake)
            .entered();
        let current = self.reload(node)?;
        let src = self.locate(&current)?;
        let soft = fake && self.metadata.delete_field().is_some();
        if fake && !soft {
            debug!("no delete marker declared, deleting rows");
        }

        let planner = self.planner();
        let subtree = planner.descendants(&src.code)?;
        let mut writes = Vec::new();
        let later = SiblingScope::after(&src.code, src.order);
        for row in planner.siblings_and_descendants_from(&later)? {
            let shifted = self.shifted(&row, src.level, -1)?;
            writes.push(self.plan_update(MutationKind::Remove, &row, shifted));
        }
        writes.push(self.plan_delete(MutationKind::Remove, &current, soft));
        for row in &subtree {
            writes.push(self.plan_delete(MutationKind::Remove, row, soft));
        }
        debug!(removed = subtree.len() + 1, soft, "planned remove");
        self.apply("removing node", writes)?;
        Ok(())
    }

    /// Stores `node`'s new name and recomputes the full names of the node
    /// and all of its descendants. Other fields of `node` are ignored.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidOperation`] if no name field is declared.
    /// - [`TreeError::NodeNotFound`] if `node` is not stored.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn rename(&self, node: &mut Record) -> TreeResult<()> {
        let _span =
            info_span!("rename", table = self.metadata.table(), key = %node.key()).entered();
        let Some(name_field) = self.metadata.name_field() else {
            return Err(TreeError::invalid_operation(format!(
                "{} has no name field",
                self.metadata.table()
            )));
        };
        let current = self.reload(node)?;
        let mut renamed = current.clone();
        renamed.set_field(name_field, self.name_of(node).as_str());

        let writes = self.plan_rename(&current, renamed)?;
        self.apply("renaming node", writes)?;
        *node = self.reload(&current)?;
        Ok(())
    }

    fn plan_rename(&self, current: &Record, mut renamed: Record) -> TreeResult<Vec<PlannedWrite>> {
        let Some(full_field) = self.metadata.full_name_field() else {
            return Ok(vec![self.plan_update(MutationKind::Rename, current, renamed)]);
        };
        let at = self.locate(current)?;
        let parent_full = self.parent_full_name(&at.code)?;
        let full = self.join_names(parent_full.as_deref(), &self.name_of(&renamed));
        renamed.set_field(full_field, full.as_str());

        let descendants = self.planner().descendants(&at.code)?;
        let mut cascaded = descendants.clone();
        let mut known = HashMap::new();
        known.insert(at.code, full);
        self.cascade_full_names(&mut cascaded, known);

        let mut writes = vec![self.plan_update(MutationKind::Rename, current, renamed)];
        for (before, after) in descendants.iter().zip(cascaded) {
            if self.full_name_of(before) != self.full_name_of(&after) {
                writes.push(self.plan_update(MutationKind::Rename, before, after));
            }
        }
        Ok(writes)
    }

    /// Saves an edited `node`.
    ///
    /// A changed name is handled as [`TreeEngine::rename`] together with the
    /// other edited fields. Positional fields cannot be edited here; use
    /// [`TreeEngine::move_node`]. A full name written by the caller is
    /// replaced by the derived one.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidOperation`] if code, order or level were edited.
    /// - [`TreeError::NodeNotFound`] if `node` is not stored.
    /// - [`TreeError::Storage`] if the store fails.
    pub fn update(&self, node: &mut Record) -> TreeResult<()> {
        let _span =
            info_span!("update", table = self.metadata.table(), key = %node.key()).entered();
        let current = self.reload(node)?;
        let change = ChangeArgument::changed(
            current.key(),
            TreeSnapshot::capture(&self.metadata, &current),
            TreeSnapshot::capture(&self.metadata, node),
        );
        if change.position_changed() {
            return Err(TreeError::invalid_operation(format!(
                "position of {} changed outside of a move",
                current.key()
            )));
        }

        let mut edited = node.clone();
        if let Some(field) = self.metadata.full_name_field() {
            match self.full_name_of(&current) {
                Some(full) => edited.set_field(field, full.as_str()),
                None => {
                    edited.remove_field(field);
                }
            }
        }

        if change.name_changed() {
            debug!("name changed, cascading");
            let writes = self.plan_rename(&current, edited)?;
            self.apply("updating node", writes)?;
        } else {
            self.store
                .update(self.metadata.table(), &edited)
                .context("failed while updating node")?;
        }
        *node = self.reload(&current)?;
        Ok(())
    }
}
