//! Folds parsed material tags into a category tree plus a flat weight map.

use std::collections::BTreeMap;

use matflow_material_models::{MaterialTag, other_name};

use crate::node::{CategoryNode, Children};
use crate::ops::search;

/// Placement decision for a terminal path segment, made before mutating
/// the tree so the uniqueness rule holds: a name carries weight in exactly
/// one place, and always under the record's own ancestors.
enum LeafAction {
    /// Ensure a leaf at the insertion point and add the weight there.
    AtPath(String),
    /// The name already carries weight somewhere in the tree; add to it.
    Existing(String),
}

/// Accumulates material paths into a shared tree while keeping weights in
/// a separate name-to-kilograms map, so several sources can later be
/// closed over one merged skeleton.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    tree: Children,
    sums: BTreeMap<String, f64>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree built so far.
    #[must_use]
    pub const fn tree(&self) -> &Children {
        &self.tree
    }

    /// Accumulated weight per category name, in kilograms.
    #[must_use]
    pub const fn sums(&self) -> &BTreeMap<String, f64> {
        &self.sums
    }

    #[must_use]
    pub fn into_parts(self) -> (Children, BTreeMap<String, f64>) {
        (self.tree, self.sums)
    }

    /// Attributes `weight_kg` to the category the tag resolves to: the
    /// leaf of a single label, or the shared-ancestor mixed leaf of a
    /// multi-label tag.
    pub fn add(&mut self, tag: &MaterialTag, weight_kg: f64) {
        if tag.labels_disagree() {
            log::warn!(
                "material labels disagree on segment order in {tag}; keeping the first label's order"
            );
        }
        if tag.is_single_segment() {
            log::debug!("single-segment material tag {tag}");
        }
        let path = tag.resolved_path();
        self.insert_path(path.segments(), weight_kg);
    }

    fn insert_path(&mut self, segments: &[String], weight_kg: f64) {
        let Some((leaf_name, ancestors)) = segments.split_last() else {
            return;
        };

        // Materialize the ancestor chain first so the placement decision
        // sees the tree as it will be at attribution time.
        for depth in 1..=ancestors.len() {
            self.ensure_branch(&ancestors[..depth]);
        }

        let action = self.leaf_action(ancestors, leaf_name);
        self.apply(ancestors, action, weight_kg);
    }

    /// Makes the node at `path` a branch, creating it when absent. A
    /// childless node that already accumulated weight keeps that weight
    /// in an overflow leaf beside the new branch, so turning a category
    /// into a grouping never drops mass and never folds it into the
    /// branch's own total.
    fn ensure_branch(&mut self, path: &[String]) {
        let Some((name, parent)) = path.split_last() else {
            return;
        };
        let state = self
            .children_at(parent)
            .get(name)
            .map(CategoryNode::is_childless);
        match state {
            Some(false) => {}
            None => {
                self.branch_children_mut(parent)
                    .push_node(name.clone(), CategoryNode::Branch(Children::new()));
            }
            Some(true) => {
                let relocation = self
                    .sums
                    .remove(name)
                    .map(|migrated| (self.overflow_action(parent, name), migrated));
                if let Some(node) = self.branch_children_mut(parent).get_mut(name) {
                    *node = CategoryNode::Branch(Children::new());
                }
                if let Some((action, migrated)) = relocation {
                    self.apply(parent, action, migrated);
                }
            }
        }
    }

    /// Decides where the terminal weight lands. A name that denotes a
    /// grouping anywhere in the tree never takes leaf weight itself; the
    /// weight stays beside the record's own ancestors under an overflow
    /// name, so no branch absorbs a total that merely shares its name.
    fn leaf_action(&self, ancestors: &[String], name: &str) -> LeafAction {
        let children = self.children_at(ancestors);
        match children.get(name) {
            Some(node) if node.is_childless() => return LeafAction::AtPath(name.to_string()),
            Some(_) => {}
            None => match search(name, &self.tree) {
                None => return LeafAction::AtPath(name.to_string()),
                Some(node) if node.is_childless() => {
                    // The same leaf name arrived via a different structural
                    // route. Keep the weights distinguishable instead of
                    // silently pooling them across two locations.
                    log::warn!(
                        "category {name:?} already holds weight elsewhere; keeping totals apart"
                    );
                }
                Some(_) => {}
            },
        }
        self.overflow_action(ancestors, name)
    }

    /// Walks the overflow names until one can take the weight: joined
    /// where it already exists as a leaf, created beside the record's own
    /// ancestors otherwise.
    fn overflow_action(&self, ancestors: &[String], name: &str) -> LeafAction {
        let children = self.children_at(ancestors);
        let mut candidate = other_name(name);
        loop {
            match children.get(&candidate) {
                Some(node) if node.is_childless() => return LeafAction::AtPath(candidate),
                Some(_) => {}
                None => match search(&candidate, &self.tree) {
                    None => return LeafAction::AtPath(candidate),
                    Some(node) if node.is_childless() => return LeafAction::Existing(candidate),
                    Some(_) => {}
                },
            }
            candidate = other_name(&candidate);
        }
    }

    fn children_at(&self, path: &[String]) -> &Children {
        let mut current = &self.tree;
        for name in path {
            if let Some(CategoryNode::Branch(children)) = current.get(name) {
                current = children;
            }
        }
        current
    }

    /// Mutable children of the branch at `path`, every node of which the
    /// ancestor pass has already materialized.
    fn branch_children_mut(&mut self, path: &[String]) -> &mut Children {
        let mut current = &mut self.tree;
        for name in path {
            current = branch_child(current, name);
        }
        current
    }

    fn apply(&mut self, ancestors: &[String], action: LeafAction, weight_kg: f64) {
        match action {
            LeafAction::AtPath(name) => {
                let children = self.branch_children_mut(ancestors);
                if !children.contains(&name) {
                    children.push_node(name.clone(), CategoryNode::Leaf);
                }
                *self.sums.entry(name).or_insert(0.0) += weight_kg;
            }
            LeafAction::Existing(name) => {
                *self.sums.entry(name).or_insert(0.0) += weight_kg;
            }
        }
    }
}

fn branch_child<'tree>(children: &'tree mut Children, name: &str) -> &'tree mut Children {
    match children.get_mut(name) {
        Some(CategoryNode::Branch(inner)) => inner,
        _ => unreachable!("ancestor {name:?} is materialized before descent"),
    }
}
