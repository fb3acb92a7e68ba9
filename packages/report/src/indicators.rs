//! The report indicators.
//!
//! Each indicator is one pass over the enriched records and produces a
//! JSON-ready payload. Conversion into the run's unit happens here;
//! everything upstream stays in kilograms.

use std::collections::BTreeMap;

use matflow_aggregate::tools::{Aggregation, DimensionValues, percentages, totals};
use matflow_aggregate::{WeightUnit, unit::to_unit};
use matflow_classify::coefficient::CoefficientTable;
use matflow_flow_models::{AdminLevel, Dimension, FlowRecord, FlowScope, Role, Scheme};
use matflow_hierarchy::export::{
    MaterialTableRow, SankeyDiagram, TreeNode, to_material_table, to_sankey, to_tree_nodes,
};
use matflow_hierarchy::{Children, TreeBuilder, ops};
use matflow_material_models::{MaterialTag, UNKNOWN};
use serde::{Deserialize, Serialize};

/// Treatment-method buckets in fixed presentation order: reuse,
/// recycling, incineration, landfill, other. The unknown sentinel is
/// appended as a sixth bucket at aggregation time.
pub const TREATMENT_ORDER: &[&str] = &[
    "Hergebruik",
    "Recycling",
    "Verbranden",
    "Storten",
    "Overig",
];

/// Treatment buckets that count towards the recycling share.
pub const RECYCLING_BUCKETS: &[&str] = &["Hergebruik", "Recycling"];

const fn area_dimension(level: AdminLevel) -> Dimension {
    Dimension::Area {
        role: Role::Origin,
        level,
    }
}

fn area_values(areas: &[String], level: AdminLevel) -> DimensionValues {
    let expected: Vec<&str> = areas.iter().map(String::as_str).collect();
    DimensionValues::fixed(area_dimension(level), &expected)
}

/// Total waste weight per origin area, zero-filled over the configured
/// area list.
#[must_use]
pub fn total_waste(
    records: &[FlowRecord],
    areas: &[String],
    level: AdminLevel,
    unit: WeightUnit,
) -> Aggregation {
    totals(records, &[area_values(areas, level)], unit)
}

/// Per-area treatment breakdown, absolute and as shares of the area
/// total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentMix {
    /// Amount per (area, treatment bucket).
    pub amounts: Aggregation,
    /// The same buckets as percentages of their area total. Null where
    /// the area total is zero.
    pub shares: Aggregation,
}

/// Breaks each area's waste down by treatment method.
#[must_use]
pub fn treatment_mix(
    records: &[FlowRecord],
    areas: &[String],
    level: AdminLevel,
    unit: WeightUnit,
) -> TreatmentMix {
    let mut buckets: Vec<&str> = TREATMENT_ORDER.to_vec();
    buckets.push(UNKNOWN);
    let amounts = totals(
        records,
        &[
            area_values(areas, level),
            DimensionValues::fixed(Dimension::Scheme(Scheme::Treatment), &buckets),
        ],
        unit,
    );
    let reference = totals(records, &[area_values(areas, level)], unit);
    let shares = percentages(&amounts, &reference);
    TreatmentMix { amounts, shares }
}

/// Share of each area's waste landing in a recycling or reuse bucket, as
/// a percentage of the area total. Null for areas without any waste.
#[must_use]
pub fn recycling_share(
    records: &[FlowRecord],
    areas: &[String],
    level: AdminLevel,
    unit: WeightUnit,
) -> Aggregation {
    let recycled = totals(
        records.iter().filter(|record| {
            record
                .labels
                .get(Scheme::Treatment)
                .is_some_and(|label| RECYCLING_BUCKETS.contains(&label))
        }),
        &[area_values(areas, level)],
        unit,
    );
    let reference = totals(records, &[area_values(areas, level)], unit);
    percentages(&recycled, &reference)
}

/// Climate impact per origin area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    /// kg CO2-equivalent per area, zero-filled over the configured list.
    pub values: BTreeMap<String, f64>,
    /// Total record weight without a matching coefficient, in kilograms.
    /// Left out of `values` rather than counted as zero impact.
    pub unmatched_weight_kg: f64,
}

/// Multiplies record weights with per-code CO2-equivalent coefficients.
#[must_use]
pub fn environmental_impact(
    records: &[FlowRecord],
    coefficients: &CoefficientTable,
    areas: &[String],
    level: AdminLevel,
) -> EnvironmentalImpact {
    let dimension = area_dimension(level);
    let mut values: BTreeMap<String, f64> =
        areas.iter().map(|area| (area.clone(), 0.0)).collect();
    let mut unmatched_weight_kg = 0.0;
    for record in records {
        let Some(factor) = coefficients.factor(&record.origin.code) else {
            unmatched_weight_kg += record.weight_kg;
            continue;
        };
        let area = dimension
            .value(record)
            .unwrap_or_else(|| UNKNOWN.to_string());
        *values.entry(area).or_insert(0.0) += record.weight_kg * factor;
    }
    if unmatched_weight_kg > 0.0 {
        log::warn!("{unmatched_weight_kg} kg of records have no impact coefficient");
    }
    EnvironmentalImpact {
        values,
        unmatched_weight_kg,
    }
}

/// Domestic material input and consumption for the focus area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInputConsumption {
    /// Weight produced and kept inside the focus area.
    pub production: f64,
    /// Weight flowing in from outside.
    pub imports: f64,
    /// Weight flowing out.
    pub exports: f64,
    /// Domestic material input: production plus imports.
    pub dmi: f64,
    /// Domestic material consumption: input minus exports.
    pub dmc: f64,
    /// Unit of all five amounts.
    pub unit: String,
}

/// Sorts trade records into production, import and export weight by how
/// they cross the focus area boundary.
#[must_use]
pub fn material_input_consumption(
    trade: &[FlowRecord],
    focus_area: &str,
    level: AdminLevel,
    unit: WeightUnit,
) -> MaterialInputConsumption {
    let mut production_kg = 0.0;
    let mut imports_kg = 0.0;
    let mut exports_kg = 0.0;
    for record in trade {
        match record.scope(focus_area, level) {
            FlowScope::Internal => production_kg += record.weight_kg,
            FlowScope::Incoming => imports_kg += record.weight_kg,
            FlowScope::Outgoing => exports_kg += record.weight_kg,
            FlowScope::External => {}
        }
    }
    let production = to_unit(production_kg, unit);
    let imports = to_unit(imports_kg, unit);
    let exports = to_unit(exports_kg, unit);
    MaterialInputConsumption {
        production,
        imports,
        exports,
        dmi: production + imports,
        dmc: production + imports - exports,
        unit: unit.to_string(),
    }
}

/// Chart-ready views of one source's material hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionViews {
    /// Nested category tree.
    pub tree: Vec<TreeNode>,
    /// Flow-diagram nodes and links.
    pub sankey: SankeyDiagram,
    /// Flat table in tree order.
    pub table: Vec<MaterialTableRow>,
}

/// Material composition of the waste records and, when a trade table is
/// configured, of the traded goods, both rendered over one shared
/// category skeleton so the charts line up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialComposition {
    /// Views over the waste records.
    pub waste: CompositionViews,
    /// Views over the trade records, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods: Option<CompositionViews>,
}

/// Builds the material category trees and their chart exports.
#[must_use]
pub fn material_composition(
    waste: &[FlowRecord],
    goods: Option<&[FlowRecord]>,
    unit: WeightUnit,
) -> MaterialComposition {
    let (waste_tree, waste_sums) = build_hierarchy(waste).into_parts();
    let Some(goods_records) = goods else {
        return MaterialComposition {
            waste: views(&waste_tree, &waste_sums, unit),
            goods: None,
        };
    };
    let (goods_tree, goods_sums) = build_hierarchy(goods_records).into_parts();
    // One skeleton for both sources, so each source's zero categories
    // still show up where the other has weight.
    let mut skeleton = ops::merge(&goods_tree, &waste_tree);
    ops::reset_to_skeleton(&mut skeleton);
    MaterialComposition {
        waste: views(&skeleton, &waste_sums, unit),
        goods: Some(views(&skeleton, &goods_sums, unit)),
    }
}

fn build_hierarchy(records: &[FlowRecord]) -> TreeBuilder {
    // Group per distinct tag first so every tag is inserted once with its
    // summed weight.
    let mut grouped: BTreeMap<String, (MaterialTag, f64)> = BTreeMap::new();
    let mut untagged_kg = 0.0;
    for record in records {
        match &record.materials {
            Some(tag) => {
                let entry = grouped
                    .entry(tag.to_string())
                    .or_insert_with(|| (tag.clone(), 0.0));
                entry.1 += record.weight_kg;
            }
            None => untagged_kg += record.weight_kg,
        }
    }
    if untagged_kg > 0.0 {
        log::warn!("{untagged_kg} kg of records have no material tag; excluded from the hierarchy");
    }
    let mut builder = TreeBuilder::new();
    for (tag, weight_kg) in grouped.values() {
        builder.add(tag, *weight_kg);
    }
    builder
}

fn views(tree: &Children, sums: &BTreeMap<String, f64>, unit: WeightUnit) -> CompositionViews {
    CompositionViews {
        tree: to_tree_nodes(tree, sums, unit),
        sankey: to_sankey(tree, sums, unit),
        table: to_material_table(tree, sums, unit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matflow_flow_models::{ClassificationLabels, Endpoint, Period};

    fn record(area: &str, treatment: Option<&str>, weight_kg: f64) -> FlowRecord {
        let mut origin = Endpoint::from_code("O1");
        origin
            .area
            .set(AdminLevel::Municipality, Some(area.to_string()));
        let mut labels = ClassificationLabels::default();
        if let Some(label) = treatment {
            labels.set(Scheme::Treatment, label.to_string());
        }
        FlowRecord {
            weight_kg,
            period: Period {
                year: 2022,
                month: None,
            },
            origin,
            destination: Endpoint::from_code("D1"),
            materials: None,
            labels,
        }
    }

    fn trade_record(origin_area: Option<&str>, destination_area: Option<&str>, kg: f64) -> FlowRecord {
        let mut flow = record("x", None, kg);
        flow.origin
            .area
            .set(AdminLevel::Municipality, origin_area.map(ToString::to_string));
        flow.destination
            .area
            .set(AdminLevel::Municipality, destination_area.map(ToString::to_string));
        flow
    }

    fn tagged(tag: &str, kg: f64) -> FlowRecord {
        let mut flow = record("x", None, kg);
        flow.materials = Some(MaterialTag::parse(tag).unwrap());
        flow
    }

    fn areas(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn total_waste_zero_fills_and_converts() {
        let records = [record("A", None, 1500.0)];
        let result = total_waste(
            &records,
            &areas(&["A", "B"]),
            AdminLevel::Municipality,
            WeightUnit::Tonne,
        );
        assert_eq!(result.unit, "t");
        assert_eq!(result.amount(&["A"]), Some(1.5));
        assert_eq!(result.amount(&["B"]), Some(0.0));
    }

    #[test]
    fn treatment_mix_reports_fixed_buckets_with_shares() {
        let records = [
            record("A", Some("Recycling"), 30.0),
            record("A", Some("Verbranden"), 50.0),
            record("A", None, 20.0),
        ];
        let mix = treatment_mix(
            &records,
            &areas(&["A"]),
            AdminLevel::Municipality,
            WeightUnit::Kilogram,
        );
        assert_eq!(mix.amounts.entries.len(), 6);
        assert_eq!(mix.amounts.entries[0].key, ["A", "Hergebruik"]);
        assert_eq!(mix.amounts.amount(&["A", "Recycling"]), Some(30.0));
        assert_eq!(mix.amounts.amount(&["A", "Hergebruik"]), Some(0.0));
        assert_eq!(mix.amounts.amount(&["A", UNKNOWN]), Some(20.0));
        assert_eq!(mix.shares.unit, "%");
        assert_eq!(mix.shares.amount(&["A", "Verbranden"]), Some(50.0));
        assert_eq!(mix.shares.amount(&["A", UNKNOWN]), Some(20.0));
    }

    #[test]
    fn recycling_share_counts_reuse_and_recycling_only() {
        let records = [
            record("A", Some("Hergebruik"), 25.0),
            record("A", Some("Recycling"), 25.0),
            record("A", Some("Storten"), 50.0),
        ];
        let share = recycling_share(
            &records,
            &areas(&["A", "B"]),
            AdminLevel::Municipality,
            WeightUnit::Kilogram,
        );
        assert_eq!(share.unit, "%");
        assert_eq!(share.amount(&["A"]), Some(50.0));
        // No waste in B at all, so there is no meaningful share.
        assert_eq!(share.amount(&["B"]), None);
    }

    #[test]
    fn environmental_impact_tracks_unmatched_weight() {
        let coefficients =
            CoefficientTable::from_reader("code;co2_per_kg\n000123;2.5\n".as_bytes(), "co2_per_kg")
                .unwrap();
        let mut matched = record("A", None, 100.0);
        matched.origin.code = "123".to_string();
        let mut unmatched = record("A", None, 40.0);
        unmatched.origin.code = "999999".to_string();

        let impact = environmental_impact(
            &[matched, unmatched],
            &coefficients,
            &areas(&["A", "B"]),
            AdminLevel::Municipality,
        );
        assert_eq!(impact.values.get("A"), Some(&250.0));
        assert_eq!(impact.values.get("B"), Some(&0.0));
        assert_eq!(impact.unmatched_weight_kg, 40.0);
    }

    #[test]
    fn material_input_consumption_computes_dmi_and_dmc() {
        let trade = [
            trade_record(Some("Delft"), Some("Delft"), 1000.0),
            trade_record(Some("Gouda"), Some("Delft"), 500.0),
            trade_record(Some("Delft"), Some("Gouda"), 250.0),
            trade_record(Some("Gouda"), None, 99.0),
        ];
        let result = material_input_consumption(
            &trade,
            "Delft",
            AdminLevel::Municipality,
            WeightUnit::Tonne,
        );
        assert_eq!(result.production, 1.0);
        assert_eq!(result.imports, 0.5);
        assert_eq!(result.exports, 0.25);
        assert_eq!(result.dmi, 1.5);
        assert_eq!(result.dmc, 1.25);
        assert_eq!(result.unit, "t");
    }

    #[test]
    fn composition_without_trade_has_no_goods_views() {
        let waste = [tagged("Biotisch,Hout", 40.0), tagged("Biotisch,Papier", 10.0)];
        let composition = material_composition(&waste, None, WeightUnit::Kilogram);
        assert!(composition.goods.is_none());
        assert_eq!(composition.waste.tree[0].name, "Biotisch");
        assert_eq!(composition.waste.tree[0].value, Some(50.0));
        assert_eq!(composition.waste.table[0].key, 1);
    }

    #[test]
    fn composition_renders_both_sources_over_one_skeleton() {
        let waste = [
            tagged("Biotisch,Hout", 20.0),
            tagged("Biotisch,Hout", 20.0),
            tagged("Biotisch,Papier", 10.0),
            record("A", None, 999.0),
        ];
        let goods = [tagged("Biotisch,Textiel", 5.0)];
        let composition =
            material_composition(&waste, Some(&goods), WeightUnit::Kilogram);

        let waste_root = &composition.waste.tree[0];
        assert_eq!(waste_root.name, "Biotisch");
        // The untagged 999 kg record stays out of the hierarchy.
        assert_eq!(waste_root.value, Some(50.0));
        let names: Vec<&str> = waste_root
            .children
            .iter()
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(names, ["Hout", "Papier", "Textiel"]);
        assert_eq!(waste_root.children[0].value, Some(40.0));
        assert_eq!(waste_root.children[2].value, Some(0.0));

        let goods_views = composition.goods.unwrap();
        let goods_root = &goods_views.tree[0];
        assert_eq!(goods_root.value, Some(5.0));
        assert_eq!(goods_root.children[0].value, Some(0.0));
        assert_eq!(goods_root.children[2].value, Some(5.0));
    }
}
