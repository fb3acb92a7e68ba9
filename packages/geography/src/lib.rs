#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative-area resolution for flow records.
//!
//! Loads area polygons from `GeoJSON`, builds an R-tree index for
//! point-in-polygon attribution, and resolves postcode prefixes through a
//! lookup table. Both paths attach municipality/province names to record
//! endpoints; records that match nothing keep empty area tags and surface
//! downstream as an unknown-area bucket.

pub mod index;
pub mod postcode;
pub mod resolve;

use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;
use thiserror::Error;
use wkt::TryFromWkt;

/// Errors that can occur while loading area reference data.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Reading an input file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a CSV lookup table failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parsing a `GeoJSON` document failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// A named administrative region with its geometry and an optional parent
/// region (e.g. a municipality's province). Static reference data, loaded
/// once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPolygon {
    /// Area name, used as the join key in all outputs.
    pub name: String,
    /// Name of the enclosing area one level up, when the source provides it.
    pub parent: Option<String>,
    /// Polygon geometry (WGS84).
    pub geometry: MultiPolygon<f64>,
}

/// Loads area polygons from a `GeoJSON` `FeatureCollection` file.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read or is not a valid
/// `FeatureCollection`. Features without a `name` property or without
/// polygon geometry are skipped with a warning, not treated as fatal.
pub fn load_areas(path: &Path) -> Result<Vec<AreaPolygon>, GeoError> {
    let raw = std::fs::read_to_string(path)?;
    let areas = parse_areas(&raw)?;
    log::info!("Loaded {} area polygons from {}", areas.len(), path.display());
    Ok(areas)
}

/// Parses a `GeoJSON` `FeatureCollection` string into area polygons.
///
/// # Errors
///
/// Returns [`GeoError`] if the document does not parse or is not a
/// `FeatureCollection`.
pub fn parse_areas(raw: &str) -> Result<Vec<AreaPolygon>, GeoError> {
    let geojson: GeoJson = raw.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GeoError::Conversion {
            message: "expected a GeoJSON FeatureCollection of areas".to_string(),
        });
    };

    let mut areas = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(name) = property_string(&feature, "name") else {
            log::warn!("Skipping area feature without a name property");
            continue;
        };
        let parent = property_string(&feature, "parent");
        let Some(geometry) = feature.geometry.and_then(to_multipolygon) else {
            log::warn!("Skipping area {name}: no polygon geometry");
            continue;
        };
        areas.push(AreaPolygon {
            name,
            parent,
            geometry,
        });
    }
    Ok(areas)
}

/// Parses a WKT `POINT(lng lat)` string into a coordinate pair. Returns
/// `None` for anything that is not a parseable point, so malformed location
/// fields degrade to an unknown location instead of an error.
#[must_use]
pub fn parse_point_wkt(raw: &str) -> Option<(f64, f64)> {
    let point: geo::Point<f64> = geo::Point::try_from_wkt_str(raw.trim()).ok()?;
    Some((point.x(), point.y()))
}

fn property_string(feature: &geojson::Feature, key: &str) -> Option<String> {
    feature
        .properties
        .as_ref()?
        .get(key)?
        .as_str()
        .map(ToString::to_string)
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`]. Handles both
/// `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
