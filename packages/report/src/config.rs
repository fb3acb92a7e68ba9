//! Run configuration, loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use matflow_aggregate::WeightUnit;
use matflow_flow_models::AdminLevel;
use serde::Deserialize;

use crate::ReportError;

/// Column holding the impact factor when the configuration names none.
pub const DEFAULT_IMPACT_COLUMN: &str = "co2_per_kg";

// ── Top-level run configuration ──────────────────────────────────────────

/// A complete report run, read from TOML:
///
/// ```toml
/// [focus]
/// area = "Utrecht"
/// level = "PROVINCE"
/// year = 2022
/// unit = "t"
/// areas = ["Amersfoort", "Utrecht", "Veenendaal"]
///
/// [inputs]
/// flows = "data/flows_2022.csv"
/// classifications = "data/classifications.csv"
/// trade = "data/trade_2022.csv"
/// impact_coefficients = "data/co2_factors.csv"
/// areas_geojson = "data/municipalities.geojson"
/// postcodes = "data/postcode_areas.csv"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// What the report is about.
    pub focus: FocusConfig,
    /// Where the input files live.
    pub inputs: InputsConfig,
}

/// The reporting frame: which area, which year, which unit.
#[derive(Debug, Clone, Deserialize)]
pub struct FocusConfig {
    /// Name of the focus area, spelled as in the area reference data.
    pub area: String,
    /// Administrative level of the focus area.
    pub level: AdminLevel,
    /// Reporting year; records from other years are dropped after reading.
    pub year: u16,
    /// Unit that aggregated amounts are reported in.
    pub unit: WeightUnit,
    /// Exhaustive list of areas that per-area results are zero-filled
    /// over, in presentation order.
    pub areas: Vec<String>,
}

// ── Input files ──────────────────────────────────────────────────────────

/// Input file locations. Leaving an optional input out switches the
/// indicator or join that depends on it off for the run.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    /// Waste flow records (comma-delimited CSV).
    pub flows: PathBuf,
    /// Classification table (semicolon-delimited CSV, one column per
    /// scheme).
    pub classifications: PathBuf,
    /// Trade flow records for material input/consumption, same layout as
    /// `flows`.
    #[serde(default)]
    pub trade: Option<PathBuf>,
    /// CO2-equivalent coefficients per classification code.
    #[serde(default)]
    pub impact_coefficients: Option<PathBuf>,
    /// Column of `impact_coefficients` holding the factor.
    #[serde(default)]
    pub impact_column: Option<String>,
    /// Area polygons as a `GeoJSON` feature collection.
    #[serde(default)]
    pub areas_geojson: Option<PathBuf>,
    /// Administrative level of the polygons in `areas_geojson`.
    #[serde(default)]
    pub areas_level: Option<AdminLevel>,
    /// Postcode-prefix-to-area lookup (semicolon-delimited CSV).
    #[serde(default)]
    pub postcodes: Option<PathBuf>,
}

impl RunConfig {
    /// Reads and parses a run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the file cannot be read or is not valid
    /// TOML for this layout.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        log::info!(
            "Loaded run configuration for {} {} from {}",
            config.focus.area,
            config.focus.year,
            path.display()
        );
        Ok(config)
    }

    /// Checks that every configured input path points to an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::MissingInput`] for the first path that does
    /// not.
    pub fn validate(&self) -> Result<(), ReportError> {
        for path in self.input_paths() {
            if !path.is_file() {
                return Err(ReportError::MissingInput {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// All configured input paths, required ones first.
    #[must_use]
    pub fn input_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.inputs.flows.as_path(), self.inputs.classifications.as_path()];
        paths.extend(self.inputs.trade.as_deref());
        paths.extend(self.inputs.impact_coefficients.as_deref());
        paths.extend(self.inputs.areas_geojson.as_deref());
        paths.extend(self.inputs.postcodes.as_deref());
        paths
    }

    /// The coefficient column to read impact factors from.
    #[must_use]
    pub fn impact_column(&self) -> &str {
        self.inputs
            .impact_column
            .as_deref()
            .unwrap_or(DEFAULT_IMPACT_COLUMN)
    }

    /// The administrative level of the configured polygons.
    #[must_use]
    pub fn areas_level(&self) -> AdminLevel {
        self.inputs.areas_level.unwrap_or(AdminLevel::Municipality)
    }
}
