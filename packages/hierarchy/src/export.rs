//! Serialized views of a closed category tree: nested JSON, flow-diagram
//! links and flat table rows, with kilogram sums converted to the report
//! unit on the way out.

use std::collections::{BTreeMap, BTreeSet};

use matflow_aggregate::{WeightUnit, unit::to_unit};
use serde::{Deserialize, Serialize};

use crate::node::{CategoryNode, Children};
use crate::ops::{close_sums, to_table};

/// One node of the nested tree view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Node list entry of the flow diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SankeyNode {
    pub id: String,
}

/// A weighted link between a category and one of its subcategories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub unit: String,
}

/// Flow-diagram serialization of a closed tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SankeyDiagram {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

/// Flat spreadsheet-style row for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTableRow {
    pub key: u32,
    pub material: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub amount: f64,
    pub unit: String,
}

/// Nested tree view with every node's closed sum converted to `unit`.
#[must_use]
pub fn to_tree_nodes(
    tree: &Children,
    leaf_values: &BTreeMap<String, f64>,
    unit: WeightUnit,
) -> Vec<TreeNode> {
    let (_, closed) = close_sums(tree, leaf_values);
    tree_level(tree, &closed, unit)
}

fn tree_level(
    children: &Children,
    closed: &BTreeMap<String, f64>,
    unit: WeightUnit,
) -> Vec<TreeNode> {
    children
        .iter()
        .map(|(name, node)| TreeNode {
            name: name.to_string(),
            value: closed.get(name).map(|kilograms| to_unit(*kilograms, unit)),
            children: match node {
                CategoryNode::Leaf => Vec::new(),
                CategoryNode::Branch(inner) => tree_level(inner, closed, unit),
            },
        })
        .collect()
}

/// Flow-diagram view: every category becomes a node, every parent-child
/// pair a link valued by the child's closed sum.
#[must_use]
pub fn to_sankey(
    tree: &Children,
    leaf_values: &BTreeMap<String, f64>,
    unit: WeightUnit,
) -> SankeyDiagram {
    let (edges, _) = close_sums(tree, leaf_values);

    let mut nodes = Vec::new();
    let mut seen = BTreeSet::new();
    for row in to_table(tree) {
        if seen.insert(row.name.clone()) {
            nodes.push(SankeyNode { id: row.name });
        }
    }

    let links = edges
        .into_iter()
        .map(|edge| SankeyLink {
            source: edge.source,
            target: edge.target,
            value: to_unit(edge.value, unit),
            unit: unit.to_string(),
        })
        .collect();

    SankeyDiagram { nodes, links }
}

/// Flat table view in depth-first order with auto-incremented keys.
#[must_use]
pub fn to_material_table(
    tree: &Children,
    leaf_values: &BTreeMap<String, f64>,
    unit: WeightUnit,
) -> Vec<MaterialTableRow> {
    let (_, closed) = close_sums(tree, leaf_values);
    to_table(tree)
        .into_iter()
        .map(|row| MaterialTableRow {
            key: row.key,
            amount: closed
                .get(&row.name)
                .map_or(0.0, |kilograms| to_unit(*kilograms, unit)),
            material: row.name,
            parent: row.parent,
            unit: unit.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `Totaal -> { Hout, Beton }` with 1500 kg and 500 kg.
    fn sample() -> (Children, BTreeMap<String, f64>) {
        let mut inner = Children::new();
        inner.insert("Hout", CategoryNode::Leaf);
        inner.insert("Beton", CategoryNode::Leaf);
        let mut tree = Children::new();
        tree.insert("Totaal", CategoryNode::Branch(inner));

        let values = BTreeMap::from([
            ("Hout".to_string(), 1500.0),
            ("Beton".to_string(), 500.0),
        ]);
        (tree, values)
    }

    #[test]
    fn tree_nodes_carry_converted_closed_sums() {
        let (tree, values) = sample();
        let nodes = to_tree_nodes(&tree, &values, WeightUnit::Tonne);

        assert_eq!(nodes.len(), 1);
        let root = &nodes[0];
        assert_eq!(root.name, "Totaal");
        assert_eq!(root.value, Some(2.0));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "Hout");
        assert_eq!(root.children[0].value, Some(1.5));
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn sankey_links_use_target_closed_sums() {
        let (tree, values) = sample();
        let diagram = to_sankey(&tree, &values, WeightUnit::Tonne);

        let ids: Vec<&str> = diagram.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["Totaal", "Hout", "Beton"]);

        let listed: Vec<(&str, &str, f64, &str)> = diagram
            .links
            .iter()
            .map(|link| {
                (
                    link.source.as_str(),
                    link.target.as_str(),
                    link.value,
                    link.unit.as_str(),
                )
            })
            .collect();
        assert_eq!(
            listed,
            [
                ("Totaal", "Hout", 1.5, "t"),
                ("Totaal", "Beton", 0.5, "t"),
            ]
        );
    }

    #[test]
    fn table_keys_count_depth_first() {
        let (tree, values) = sample();
        let rows = to_material_table(&tree, &values, WeightUnit::Kilogram);

        let listed: Vec<(u32, &str, Option<&str>, f64)> = rows
            .iter()
            .map(|row| {
                (
                    row.key,
                    row.material.as_str(),
                    row.parent.as_deref(),
                    row.amount,
                )
            })
            .collect();
        assert_eq!(
            listed,
            [
                (1, "Totaal", None, 2000.0),
                (2, "Hout", Some("Totaal"), 1500.0),
                (3, "Beton", Some("Totaal"), 500.0),
            ]
        );
        assert!(rows.iter().all(|row| row.unit == "kg"));
    }
}
