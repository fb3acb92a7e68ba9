//! Numeric coefficient tables keyed by classification code.
//!
//! Used by the environmental-impact indicators: each code maps to a factor
//! (e.g. kg CO2-equivalent per kg of material) applied to record weights.
//! Codes are normalized with the same rules as classification tables.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{ClassifyError, normalize_code};

/// A code-to-factor lookup for impact computations.
pub struct CoefficientTable {
    factors: BTreeMap<String, f64>,
}

impl CoefficientTable {
    /// Loads the table from a `;`-delimited CSV file, reading factors from
    /// the named value column.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the file cannot be read, is not valid
    /// CSV, or lacks the `code` or value column.
    pub fn load(path: &Path, value_column: &str) -> Result<Self, ClassifyError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file, value_column)?;
        log::info!(
            "Loaded {} {value_column} coefficients from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Builds the table from CSV data.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the data is not valid CSV or lacks the
    /// `code` or value column. Rows whose value cell does not parse as a
    /// number are skipped with a warning, not treated as fatal.
    pub fn from_reader(
        reader: impl std::io::Read,
        value_column: &str,
    ) -> Result<Self, ClassifyError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let code_col = headers.iter().position(|h| h == "code").ok_or_else(|| {
            ClassifyError::Conversion {
                message: "coefficient table is missing a \"code\" column".to_string(),
            }
        })?;
        let value_col = headers.iter().position(|h| h == value_column).ok_or_else(|| {
            ClassifyError::Conversion {
                message: format!("coefficient table is missing a {value_column:?} column"),
            }
        })?;

        let mut factors = BTreeMap::new();
        let mut skipped = 0_usize;
        for row in csv_reader.records() {
            let row = row?;
            let Some(code) = row.get(code_col).filter(|c| !c.is_empty()) else {
                continue;
            };
            let Some(factor) = row.get(value_col).and_then(parse_number) else {
                skipped += 1;
                continue;
            };
            factors.insert(normalize_code(code), factor);
        }
        if skipped > 0 {
            log::warn!("Skipped {skipped} coefficient rows without a numeric {value_column:?}");
        }

        Ok(Self { factors })
    }

    /// The factor for a code, if present.
    #[must_use]
    pub fn factor(&self, code: &str) -> Option<f64> {
        self.factors.get(&normalize_code(code)).copied()
    }

    /// Number of codes with a factor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether the table holds no factors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Parses a number that may use a comma decimal separator, as `;`-delimited
/// Dutch CSV exports commonly do.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}
