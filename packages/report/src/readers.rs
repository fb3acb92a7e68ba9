//! CSV readers for flow and trade records.
//!
//! Both tables share one layout: a weight, a period, two coded endpoints
//! with optional locations, and an optional material tag. Rows whose
//! weight or year does not parse are skipped with a warning; a missing
//! required column fails the whole read.

use std::fs::File;
use std::path::Path;

use matflow_flow_models::{ClassificationLabels, Endpoint, FlowRecord, Location, Period};
use matflow_geography::parse_point_wkt;
use matflow_material_models::MaterialTag;

use crate::ReportError;

/// Reads waste flow records from a comma-delimited CSV file.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be opened or the table lacks
/// a required column.
pub fn read_flow_records(path: &Path) -> Result<Vec<FlowRecord>, ReportError> {
    let file = File::open(path)?;
    let records = parse_records(file)?;
    log::info!("Read {} flow records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads trade flow records; same layout as the waste table.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be opened or the table lacks
/// a required column.
pub fn read_trade_records(path: &Path) -> Result<Vec<FlowRecord>, ReportError> {
    let file = File::open(path)?;
    let records = parse_records(file)?;
    log::info!("Read {} trade records from {}", records.len(), path.display());
    Ok(records)
}

/// Parses flow records from CSV data.
///
/// # Errors
///
/// Returns [`ReportError`] if the data is not valid CSV or is missing one
/// of the `weight_kg`, `year`, `origin_code` or `destination_code`
/// columns.
pub fn parse_records(reader: impl std::io::Read) -> Result<Vec<FlowRecord>, ReportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let weight_col = required_column(&headers, "weight_kg")?;
    let year_col = required_column(&headers, "year")?;
    let origin_col = required_column(&headers, "origin_code")?;
    let destination_col = required_column(&headers, "destination_code")?;
    let month_col = column(&headers, "month");
    let origin_location_col = column(&headers, "origin_location");
    let destination_location_col = column(&headers, "destination_location");
    let materials_col = column(&headers, "materials");

    let mut records = Vec::new();
    let mut skipped = 0_usize;
    for row in csv_reader.records() {
        let row = row?;
        let Some(weight_kg) = row.get(weight_col).and_then(parse_weight) else {
            skipped += 1;
            continue;
        };
        let Some(year) = row.get(year_col).and_then(|cell| cell.parse().ok()) else {
            skipped += 1;
            continue;
        };
        let month = month_col
            .and_then(|idx| row.get(idx))
            .and_then(|cell| cell.parse().ok());

        let mut origin = Endpoint::from_code(row.get(origin_col).unwrap_or_default());
        let mut destination = Endpoint::from_code(row.get(destination_col).unwrap_or_default());
        if let Some(cell) = origin_location_col.and_then(|idx| row.get(idx)) {
            origin.location = parse_location(cell);
        }
        if let Some(cell) = destination_location_col.and_then(|idx| row.get(idx)) {
            destination.location = parse_location(cell);
        }

        let materials = materials_col
            .and_then(|idx| row.get(idx))
            .filter(|cell| !cell.is_empty())
            .and_then(|cell| match MaterialTag::parse(cell) {
                Ok(tag) => Some(tag),
                Err(error) => {
                    log::warn!("Dropping material tag {cell:?}: {error}");
                    None
                }
            });

        records.push(FlowRecord {
            weight_kg,
            period: Period { year, month },
            origin,
            destination,
            materials,
            labels: ClassificationLabels::default(),
        });
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} rows with a malformed weight or year");
    }
    Ok(records)
}

/// Interprets a location cell. WKT points become coordinates, cells
/// starting with a digit become postcodes, everything else is unknown.
#[must_use]
pub fn parse_location(raw: &str) -> Location {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Location::Unknown;
    }
    if let Some((longitude, latitude)) = parse_point_wkt(trimmed) {
        return Location::Coordinates { longitude, latitude };
    }
    if trimmed.bytes().next().is_some_and(|byte| byte.is_ascii_digit()) {
        return Location::Postcode(trimmed.to_string());
    }
    Location::Unknown
}

fn parse_weight(cell: &str) -> Option<f64> {
    let cleaned = cell.replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|weight| weight.is_finite() && *weight >= 0.0)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.eq_ignore_ascii_case(name))
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize, ReportError> {
    column(headers, name).ok_or_else(|| ReportError::Conversion {
        message: format!("flow table is missing a {name:?} column"),
    })
}
