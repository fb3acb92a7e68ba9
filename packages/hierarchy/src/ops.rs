//! Operations over category trees: structural merge, skeleton reset,
//! search, flattening, bottom-up sum closure and table conversion.

use std::collections::{BTreeMap, BTreeSet};

use crate::node::{CategoryNode, Children};

/// A directed parent-to-child edge of a closed tree. The value is the
/// child's closed sum, the amount flowing into that category.
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
}

/// One row of the flattened tree, in depth-first order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Auto-incremented row key, starting at 1.
    pub key: u32,
    pub name: String,
    /// Name of the parent category, `None` for root-level rows.
    pub parent: Option<String>,
}

/// Structural merge of two trees: the union of both key sets, recursing
/// into branches present on both sides. `add` wins when a name is a leaf
/// on one side and a branch on the other.
#[must_use]
pub fn merge(add: &Children, base: &Children) -> Children {
    let mut merged = Children::new();
    for (name, base_node) in base.iter() {
        let node = match (add.get(name), base_node) {
            (Some(CategoryNode::Branch(add_inner)), CategoryNode::Branch(base_inner)) => {
                CategoryNode::Branch(merge(add_inner, base_inner))
            }
            (Some(add_node), _) => add_node.clone(),
            (None, _) => base_node.clone(),
        };
        merged.insert(name, node);
    }
    for (name, add_node) in add.iter() {
        if !merged.contains(name) {
            merged.insert(name, add_node.clone());
        }
    }
    merged
}

/// Replaces every leaf with an empty branch placeholder, leaving a pure
/// shape that several sources' sum maps can each be closed over.
pub fn reset_to_skeleton(tree: &mut Children) {
    for node in tree.nodes_mut() {
        match node {
            CategoryNode::Leaf => *node = CategoryNode::Branch(Children::new()),
            CategoryNode::Branch(children) => reset_to_skeleton(children),
        }
    }
}

/// Depth-first search for `name` anywhere in the tree, returning the
/// first matching node.
#[must_use]
pub fn search<'tree>(name: &str, tree: &'tree Children) -> Option<&'tree CategoryNode> {
    for (key, node) in tree.iter() {
        if key == name {
            return Some(node);
        }
        if let CategoryNode::Branch(children) = node {
            if let Some(found) = search(name, children) {
                return Some(found);
            }
        }
    }
    None
}

/// All category names in the tree, unique and in ascending order.
#[must_use]
pub fn flatten(tree: &Children) -> Vec<String> {
    let mut names = BTreeSet::new();
    collect_names(tree, &mut names);
    names.into_iter().collect()
}

fn collect_names(tree: &Children, names: &mut BTreeSet<String>) {
    for (name, node) in tree.iter() {
        names.insert(name.to_string());
        if let CategoryNode::Branch(children) = node {
            collect_names(children, names);
        }
    }
}

/// Closes a tree bottom-up against a flat leaf-value map.
///
/// Childless nodes take their value from `leaf_values` (0 when absent);
/// every other node's value is the sum of its children's closed values.
/// Returns the deduplicated parent-to-child edge list plus the closed
/// name-to-value map.
#[must_use]
pub fn close_sums(
    tree: &Children,
    leaf_values: &BTreeMap<String, f64>,
) -> (Vec<SankeyEdge>, BTreeMap<String, f64>) {
    let mut closed = BTreeMap::new();
    for (name, node) in tree.iter() {
        close_node(name, node, leaf_values, &mut closed);
    }

    let mut edges = Vec::new();
    let mut seen = BTreeSet::new();
    collect_edges(tree, &closed, &mut edges, &mut seen);
    (edges, closed)
}

fn close_node(
    name: &str,
    node: &CategoryNode,
    leaf_values: &BTreeMap<String, f64>,
    closed: &mut BTreeMap<String, f64>,
) -> f64 {
    let value = match node {
        CategoryNode::Branch(children) if !children.is_empty() => children
            .iter()
            .map(|(child_name, child)| close_node(child_name, child, leaf_values, closed))
            .sum(),
        _ => leaf_values.get(name).copied().unwrap_or(0.0),
    };
    closed.insert(name.to_string(), value);
    value
}

fn collect_edges(
    tree: &Children,
    closed: &BTreeMap<String, f64>,
    edges: &mut Vec<SankeyEdge>,
    seen: &mut BTreeSet<(String, String)>,
) {
    for (name, node) in tree.iter() {
        let CategoryNode::Branch(children) = node else {
            continue;
        };
        for (child_name, _) in children.iter() {
            if seen.insert((name.to_string(), child_name.to_string())) {
                edges.push(SankeyEdge {
                    source: name.to_string(),
                    target: child_name.to_string(),
                    value: closed.get(child_name).copied().unwrap_or(0.0),
                });
            }
        }
        collect_edges(children, closed, edges, seen);
    }
}

/// Flattens a tree into rows with auto-incremented keys, depth-first, so
/// every child row follows its parent and refers back to it by name.
#[must_use]
pub fn to_table(tree: &Children) -> Vec<TableRow> {
    let mut rows = Vec::new();
    let mut next_key = 1;
    collect_rows(tree, None, &mut rows, &mut next_key);
    rows
}

fn collect_rows(
    tree: &Children,
    parent: Option<&str>,
    rows: &mut Vec<TableRow>,
    next_key: &mut u32,
) {
    for (name, node) in tree.iter() {
        rows.push(TableRow {
            key: *next_key,
            name: name.to_string(),
            parent: parent.map(ToString::to_string),
        });
        *next_key += 1;
        if let CategoryNode::Branch(children) = node {
            collect_rows(children, Some(name), rows, next_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `A -> { B, C -> { D } }` with B and D as leaves.
    fn sample_tree() -> Children {
        let mut c = Children::new();
        c.insert("D", CategoryNode::Leaf);
        let mut a = Children::new();
        a.insert("B", CategoryNode::Leaf);
        a.insert("C", CategoryNode::Branch(c));
        let mut root = Children::new();
        root.insert("A", CategoryNode::Branch(a));
        root
    }

    fn sample_values() -> BTreeMap<String, f64> {
        BTreeMap::from([("B".to_string(), 1.0), ("D".to_string(), 2.0)])
    }

    #[test]
    fn merge_unions_key_sets_in_either_order() {
        let mut left = Children::new();
        let mut x = Children::new();
        x.insert("Y", CategoryNode::Leaf);
        left.insert("X", CategoryNode::Branch(x));

        let mut right = Children::new();
        let mut x = Children::new();
        x.insert("Z", CategoryNode::Leaf);
        right.insert("X", CategoryNode::Branch(x));

        for merged in [merge(&left, &right), merge(&right, &left)] {
            let CategoryNode::Branch(x) = merged.get("X").unwrap() else {
                panic!("X should be a branch");
            };
            let mut names: Vec<&str> = x.iter().map(|(name, _)| name).collect();
            names.sort_unstable();
            assert_eq!(names, ["Y", "Z"]);
        }
    }

    #[test]
    fn merge_prefers_add_on_shape_conflict() {
        let mut add = Children::new();
        add.insert("X", CategoryNode::Leaf);
        let mut base = Children::new();
        let mut x = Children::new();
        x.insert("Y", CategoryNode::Leaf);
        base.insert("X", CategoryNode::Branch(x));

        let merged = merge(&add, &base);
        assert_eq!(merged.get("X"), Some(&CategoryNode::Leaf));
    }

    #[test]
    fn reset_leaves_placeholders_everywhere() {
        let mut tree = sample_tree();
        reset_to_skeleton(&mut tree);

        let CategoryNode::Branch(a) = tree.get("A").unwrap() else {
            panic!("A should stay a branch");
        };
        assert_eq!(a.get("B"), Some(&CategoryNode::Branch(Children::new())));
        let CategoryNode::Branch(c) = a.get("C").unwrap() else {
            panic!("C should stay a branch");
        };
        assert_eq!(c.get("D"), Some(&CategoryNode::Branch(Children::new())));
    }

    #[test]
    fn search_finds_nested_nodes() {
        let tree = sample_tree();
        assert_eq!(search("D", &tree), Some(&CategoryNode::Leaf));
        assert!(matches!(
            search("C", &tree),
            Some(&CategoryNode::Branch(_))
        ));
        assert_eq!(search("E", &tree), None);
    }

    #[test]
    fn flatten_lists_all_names_sorted() {
        assert_eq!(flatten(&sample_tree()), ["A", "B", "C", "D"]);
    }

    #[test]
    fn close_sums_adds_bottom_up() {
        let (edges, closed) = close_sums(&sample_tree(), &sample_values());

        assert_eq!(closed.get("B"), Some(&1.0));
        assert_eq!(closed.get("D"), Some(&2.0));
        assert_eq!(closed.get("C"), Some(&2.0));
        assert_eq!(closed.get("A"), Some(&3.0));

        let listed: Vec<(&str, &str, f64)> = edges
            .iter()
            .map(|edge| (edge.source.as_str(), edge.target.as_str(), edge.value))
            .collect();
        assert_eq!(
            listed,
            [("A", "B", 1.0), ("A", "C", 2.0), ("C", "D", 2.0)]
        );
    }

    #[test]
    fn close_sums_defaults_missing_leaves_to_zero() {
        let (_, closed) = close_sums(&sample_tree(), &BTreeMap::new());
        assert_eq!(closed.get("B"), Some(&0.0));
        assert_eq!(closed.get("A"), Some(&0.0));
    }

    #[test]
    fn skeleton_placeholders_still_take_values() {
        let mut tree = sample_tree();
        reset_to_skeleton(&mut tree);
        let (_, closed) = close_sums(&tree, &sample_values());
        assert_eq!(closed.get("A"), Some(&3.0));
    }

    #[test]
    fn internal_sums_are_ignored_at_closing() {
        let mut values = sample_values();
        values.insert("A".to_string(), 100.0);
        let (_, closed) = close_sums(&sample_tree(), &values);
        assert_eq!(closed.get("A"), Some(&3.0));
    }

    #[test]
    fn table_rows_follow_depth_first_order() {
        let rows = to_table(&sample_tree());
        let listed: Vec<(u32, &str, Option<&str>)> = rows
            .iter()
            .map(|row| (row.key, row.name.as_str(), row.parent.as_deref()))
            .collect();
        assert_eq!(
            listed,
            [
                (1, "A", None),
                (2, "B", Some("A")),
                (3, "C", Some("A")),
                (4, "D", Some("C")),
            ]
        );
    }
}
