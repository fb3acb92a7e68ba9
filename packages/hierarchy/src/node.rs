//! Tree node types.
//!
//! A category tree stores shape only. Weights live in a separate flat
//! name-to-kilograms map so that several sources can share one skeleton
//! and still be closed independently (see [`crate::ops::close_sums`]).

/// A single category in a material tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryNode {
    /// Terminal category, the kind weight is attributed to.
    Leaf,
    /// Grouping category with ordered children.
    Branch(Children),
}

impl CategoryNode {
    /// Whether this node has no children. Childless nodes, leaves and
    /// skeleton placeholders alike, read their value from the flat sums
    /// map when a tree is closed.
    #[must_use]
    pub fn is_childless(&self) -> bool {
        match self {
            Self::Leaf => true,
            Self::Branch(children) => children.is_empty(),
        }
    }
}

/// Insertion-ordered children of a branch, keyed by category name.
///
/// Input order is meaningful to the chart consumers, so this is a small
/// association list rather than a sorted map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(Vec<(String, CategoryNode)>);

impl Children {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The node named `name` among the direct children.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CategoryNode> {
        self.0
            .iter()
            .find_map(|(key, node)| (key == name).then_some(node))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CategoryNode> {
        self.0
            .iter_mut()
            .find_map(|(key, node)| (&*key == name).then_some(node))
    }

    /// Appends `node` under `name`, replacing an existing node of that
    /// name in place.
    pub fn insert(&mut self, name: impl Into<String>, node: CategoryNode) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.0[index].1 = node,
            None => {
                self.0.push((name, node));
            }
        }
    }

    /// Name/node pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut CategoryNode> {
        self.0.iter_mut().map(|(_, node)| node)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(key, _)| key == name)
    }

    /// Appends without replacing an existing node of the same name.
    pub(crate) fn push_node(&mut self, name: String, node: CategoryNode) {
        self.0.push((name, node));
    }
}
