//! The report document: ordered indicator sections plus run metadata.

use std::fs;
use std::path::{Path, PathBuf};

use matflow_aggregate::WeightUnit;
use matflow_flow_models::AdminLevel;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::ReportError;

/// Indicator sections in insertion order.
///
/// Serializes as a JSON object whose keys keep that order, so the
/// document reads top to bottom the way the dashboard presents it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections(Vec<(String, serde_json::Value)>);

impl Serialize for Sections {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Everything one run produces, written as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContext {
    /// Name of the focus area.
    pub focus: String,
    /// Administrative level of the focus area.
    pub level: AdminLevel,
    /// Reporting year.
    pub year: u16,
    /// Unit that absolute amounts are reported in.
    pub unit: WeightUnit,
    /// Indicator name to payload, in computation order.
    pub indicators: Sections,
}

impl ReportContext {
    /// An empty report for the given run frame.
    #[must_use]
    pub fn new(focus: impl Into<String>, level: AdminLevel, year: u16, unit: WeightUnit) -> Self {
        Self {
            focus: focus.into(),
            level,
            year,
            unit,
            indicators: Sections::default(),
        }
    }

    /// Adds an indicator section, replacing an earlier one of the same
    /// name in place.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Json`] if the payload does not serialize.
    pub fn insert<T: Serialize>(&mut self, name: &str, payload: &T) -> Result<(), ReportError> {
        let value = serde_json::to_value(payload)?;
        match self.indicators.0.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.indicators.0.push((name.to_string(), value)),
        }
        Ok(())
    }

    /// Serializes the report and writes it into `dir`, creating the
    /// directory as needed. The write goes through a temporary file and a
    /// rename so a crash never leaves a half-written report behind.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if serialization or any filesystem step
    /// fails.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("report_{}_{}.json", file_slug(&self.focus), self.year));
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, &path)?;
        log::info!("Wrote report to {}", path.display());
        Ok(path)
    }
}

/// Lowercases a name and squashes anything non-alphanumeric to `_`.
fn file_slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
