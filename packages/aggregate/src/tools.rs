//! Grouping, zero-fill, and percentage computations.

use std::collections::{BTreeMap, BTreeSet};

use matflow_flow_models::{Dimension, FlowRecord};
use matflow_material_models::UNKNOWN;
use serde::{Deserialize, Serialize};

use crate::unit::{WeightUnit, to_unit};

/// One output row of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationEntry {
    /// Values of the group-by dimensions, in dimension order.
    pub key: Vec<String>,
    /// Summed amount in the aggregation's unit. `None` only occurs in
    /// percentage results whose reference value was zero or missing, and
    /// serializes as JSON null.
    pub amount: Option<f64>,
}

/// A serializable aggregation result with an explicit unit tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    /// Unit of every amount in `entries`; `"%"` for percentage results.
    pub unit: String,
    /// Ordered entries. The order follows the expected-value lists handed
    /// to [`totals`], so positional chart consumers get a stable layout.
    pub entries: Vec<AggregationEntry>,
}

impl Aggregation {
    /// The amount for an exact key, if present.
    #[must_use]
    pub fn amount(&self, key: &[&str]) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| {
                entry.key.len() == key.len() && entry.key.iter().zip(key).all(|(a, b)| a == b)
            })
            .and_then(|entry| entry.amount)
    }
}

/// Expected values for one group-by dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValues {
    /// The dimension to group by.
    pub dimension: Dimension,
    /// Exhaustive expected values in output order. Combinations absent from
    /// the input appear with amount 0; observed values outside this list
    /// are not reported. `None` emits the observed values in ascending
    /// name order instead.
    pub expected: Option<Vec<String>>,
}

impl DimensionValues {
    /// Groups by the dimension, reporting observed values in name order.
    #[must_use]
    pub const fn observed(dimension: Dimension) -> Self {
        Self {
            dimension,
            expected: None,
        }
    }

    /// Groups by the dimension with an explicit, exhaustive value order.
    #[must_use]
    pub fn fixed(dimension: Dimension, expected: &[&str]) -> Self {
        Self {
            dimension,
            expected: Some(expected.iter().map(ToString::to_string).collect()),
        }
    }
}

/// Groups records by the ordered dimensions and sums their weight in
/// kilograms.
///
/// A record where a dimension yields no value lands in the [`UNKNOWN`]
/// bucket for that dimension, so nothing drops out of the totals silently.
/// Callers pre-filter with iterator adapters (e.g. only records whose
/// treatment label is in a given set) before handing records in.
#[must_use]
pub fn sum_by<'a>(
    records: impl IntoIterator<Item = &'a FlowRecord>,
    dims: &[Dimension],
) -> BTreeMap<Vec<String>, f64> {
    let mut sums: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for record in records {
        let key: Vec<String> = dims
            .iter()
            .map(|dim| dim.value(record).unwrap_or_else(|| UNKNOWN.to_string()))
            .collect();
        *sums.entry(key).or_insert(0.0) += record.weight_kg;
    }
    sums
}

/// Aggregates records into an ordered, zero-filled, unit-converted result.
///
/// The output holds exactly the cartesian product of the per-dimension
/// value lists: the caller's expected list where given (in its declared
/// order), otherwise the observed values in ascending order. Combinations
/// absent from the input appear with amount 0 rather than being omitted.
#[must_use]
pub fn totals<'a>(
    records: impl IntoIterator<Item = &'a FlowRecord>,
    specs: &[DimensionValues],
    unit: WeightUnit,
) -> Aggregation {
    let dims: Vec<Dimension> = specs.iter().map(|spec| spec.dimension).collect();
    let grouped = sum_by(records, &dims);

    let lists: Vec<Vec<String>> = specs
        .iter()
        .enumerate()
        .map(|(position, spec)| {
            spec.expected.clone().unwrap_or_else(|| {
                grouped
                    .keys()
                    .map(|key| key[position].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
        })
        .collect();

    let entries: Vec<AggregationEntry> = cartesian(&lists)
        .into_iter()
        .map(|key| {
            let weight_kg = grouped.get(&key).copied().unwrap_or(0.0);
            AggregationEntry {
                key,
                amount: Some(to_unit(weight_kg, unit)),
            }
        })
        .collect();

    log::debug!(
        "Aggregated {} grouped keys into {} ordered entries",
        grouped.len(),
        entries.len()
    );

    Aggregation {
        unit: unit.to_string(),
        entries,
    }
}

/// Expresses an aggregation as percentages of a reference aggregation.
///
/// Reference keys must equal the leading components of the aggregation's
/// keys (the same leading group-by dimensions); a per-area total therefore
/// serves as the reference for a per-area-per-category breakdown. A zero or
/// missing reference value yields `None` for that entry, never a crash and
/// never a made-up number.
#[must_use]
pub fn percentages(aggregation: &Aggregation, reference: &Aggregation) -> Aggregation {
    let prefix_len = reference
        .entries
        .first()
        .map_or(0, |entry| entry.key.len());
    let reference_amounts: BTreeMap<&[String], f64> = reference
        .entries
        .iter()
        .filter_map(|entry| entry.amount.map(|amount| (entry.key.as_slice(), amount)))
        .collect();

    let entries = aggregation
        .entries
        .iter()
        .map(|entry| {
            let prefix = &entry.key[..prefix_len.min(entry.key.len())];
            let amount = entry.amount.and_then(|value| {
                reference_amounts
                    .get(prefix)
                    .filter(|&&reference_value| reference_value != 0.0)
                    .map(|&reference_value| value / reference_value * 100.0)
            });
            AggregationEntry {
                key: entry.key.clone(),
                amount,
            }
        })
        .collect();

    Aggregation {
        unit: "%".to_string(),
        entries,
    }
}

fn cartesian(lists: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut keys: Vec<Vec<String>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(keys.len() * list.len());
        for key in &keys {
            for value in list {
                let mut extended = key.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        keys = next;
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use matflow_flow_models::{
        AdminLevel, ClassificationLabels, Endpoint, Period, Role, Scheme,
    };

    fn record(area: Option<&str>, code: &str, weight_kg: f64) -> FlowRecord {
        let mut origin = Endpoint::from_code(code);
        origin.area.municipality = area.map(ToString::to_string);
        FlowRecord {
            weight_kg,
            period: Period {
                year: 2022,
                month: None,
            },
            origin,
            destination: Endpoint::from_code("B04"),
            materials: None,
            labels: ClassificationLabels::default(),
        }
    }

    const AREA: Dimension = Dimension::Area {
        role: Role::Origin,
        level: AdminLevel::Municipality,
    };

    #[test]
    fn sums_by_area_with_zero_fill() {
        // Two areas with input rows; a third is zero-filled.
        let records = vec![
            record(Some("A"), "X", 1000.0),
            record(Some("A"), "Y", 500.0),
            record(Some("B"), "X", 0.0),
        ];
        let result = totals(
            &records,
            &[DimensionValues::fixed(AREA, &["A", "B", "C"])],
            WeightUnit::Tonne,
        );
        assert_eq!(result.unit, "t");
        assert_eq!(result.amount(&["A"]), Some(1.5));
        assert_eq!(result.amount(&["B"]), Some(0.0));
        assert_eq!(result.amount(&["C"]), Some(0.0));
        assert_eq!(result.entries.len(), 3);
    }

    #[test]
    fn explicit_order_is_preserved() {
        let records = vec![record(Some("A"), "X", 1.0), record(Some("B"), "X", 2.0)];
        let result = totals(
            &records,
            &[DimensionValues::fixed(AREA, &["B", "A"])],
            WeightUnit::Kilogram,
        );
        let order: Vec<&str> = result
            .entries
            .iter()
            .map(|entry| entry.key[0].as_str())
            .collect();
        assert_eq!(order, ["B", "A"]);
    }

    #[test]
    fn observed_values_sort_ascending() {
        let records = vec![
            record(Some("Zwolle"), "X", 1.0),
            record(Some("Arnhem"), "X", 2.0),
        ];
        let result = totals(
            &records,
            &[DimensionValues::observed(AREA)],
            WeightUnit::Kilogram,
        );
        let order: Vec<&str> = result
            .entries
            .iter()
            .map(|entry| entry.key[0].as_str())
            .collect();
        assert_eq!(order, ["Arnhem", "Zwolle"]);
    }

    #[test]
    fn unresolved_dimension_lands_in_unknown_bucket() {
        let records = vec![record(None, "X", 700.0)];
        let grouped = sum_by(&records, &[AREA]);
        assert_eq!(grouped.len(), 1);
        let (key, weight) = grouped.iter().next().unwrap();
        assert_eq!(key[0], UNKNOWN);
        assert!((weight - 700.0).abs() < f64::EPSILON);
    }

    #[test]
    fn filters_apply_before_grouping() {
        let mut wood = record(Some("A"), "X", 600.0);
        wood.labels.set(Scheme::Material, "Hout".to_string());
        let mut iron = record(Some("A"), "Y", 400.0);
        iron.labels.set(Scheme::Material, "IJzer".to_string());
        let records = vec![wood, iron];

        let result = totals(
            records
                .iter()
                .filter(|r| r.labels.get(Scheme::Material) == Some("Hout")),
            &[DimensionValues::fixed(AREA, &["A"])],
            WeightUnit::Kilogram,
        );
        assert_eq!(result.amount(&["A"]), Some(600.0));
    }

    #[test]
    fn two_dimension_cartesian_product() {
        let mut a_wood = record(Some("A"), "X", 100.0);
        a_wood.labels.set(Scheme::Material, "Hout".to_string());
        let records = vec![a_wood];

        let result = totals(
            &records,
            &[
                DimensionValues::fixed(AREA, &["A", "B"]),
                DimensionValues::fixed(Dimension::Scheme(Scheme::Material), &["Hout", "IJzer"]),
            ],
            WeightUnit::Kilogram,
        );
        assert_eq!(result.entries.len(), 4);
        assert_eq!(result.amount(&["A", "Hout"]), Some(100.0));
        assert_eq!(result.amount(&["A", "IJzer"]), Some(0.0));
        assert_eq!(result.amount(&["B", "Hout"]), Some(0.0));
    }

    #[test]
    fn percentage_of_matching_reference() {
        let records = vec![record(Some("A"), "X", 250.0), record(Some("B"), "X", 500.0)];
        let part = totals(
            records.iter().filter(|r| r.weight_kg < 300.0),
            &[DimensionValues::fixed(AREA, &["A", "B"])],
            WeightUnit::Kilogram,
        );
        let reference = totals(
            &records,
            &[DimensionValues::fixed(AREA, &["A", "B"])],
            WeightUnit::Kilogram,
        );
        let result = percentages(&part, &reference);
        assert_eq!(result.unit, "%");
        assert_eq!(result.amount(&["A"]), Some(100.0));
        assert_eq!(result.amount(&["B"]), Some(0.0));
    }

    #[test]
    fn zero_reference_yields_null() {
        let records = vec![record(Some("A"), "X", 250.0)];
        let part = totals(
            &records,
            &[DimensionValues::fixed(AREA, &["A", "C"])],
            WeightUnit::Kilogram,
        );
        let reference = totals(
            std::iter::empty(),
            &[DimensionValues::fixed(AREA, &["A", "C"])],
            WeightUnit::Kilogram,
        );
        let result = percentages(&part, &reference);
        assert_eq!(result.amount(&["A"]), None);
        assert_eq!(result.amount(&["C"]), None);
    }

    #[test]
    fn prefix_reference_divides_breakdown_rows() {
        let mut a_wood = record(Some("A"), "X", 300.0);
        a_wood.labels.set(Scheme::Material, "Hout".to_string());
        let mut a_iron = record(Some("A"), "Y", 700.0);
        a_iron.labels.set(Scheme::Material, "IJzer".to_string());
        let records = vec![a_wood, a_iron];

        let breakdown = totals(
            &records,
            &[
                DimensionValues::fixed(AREA, &["A"]),
                DimensionValues::fixed(Dimension::Scheme(Scheme::Material), &["Hout", "IJzer"]),
            ],
            WeightUnit::Kilogram,
        );
        let reference = totals(
            &records,
            &[DimensionValues::fixed(AREA, &["A"])],
            WeightUnit::Kilogram,
        );
        let result = percentages(&breakdown, &reference);
        assert_eq!(result.amount(&["A", "Hout"]), Some(30.0));
        assert_eq!(result.amount(&["A", "IJzer"]), Some(70.0));
    }
}
