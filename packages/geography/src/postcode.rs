//! Postcode-prefix lookup tables for area attribution.
//!
//! Several registry extracts carry only a postal code per endpoint instead
//! of coordinates. Those records resolve through a precomputed table from
//! 4-digit prefix to one area name per administrative level.

use std::collections::BTreeMap;
use std::path::Path;

use matflow_flow_models::AdminLevel;

use crate::GeoError;

/// Area names for one postcode prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostcodeAreas {
    /// Municipality containing the prefix, if listed.
    pub municipality: Option<String>,
    /// Province containing the prefix, if listed.
    pub province: Option<String>,
}

impl PostcodeAreas {
    /// The area name at the given level.
    #[must_use]
    pub fn get(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Municipality => self.municipality.as_deref(),
            AdminLevel::Province => self.province.as_deref(),
        }
    }
}

/// Lookup table from 4-digit postcode prefix to area names.
///
/// Built once per run from a `;`-delimited CSV with a `postcode` column and
/// `municipality`/`province` columns. Duplicate prefixes keep the first row,
/// so a lookup always yields at most one area per level.
pub struct PostcodeLookup {
    map: BTreeMap<String, PostcodeAreas>,
}

impl PostcodeLookup {
    /// Loads the lookup table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be read, is not valid CSV, or
    /// lacks the required columns.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let file = std::fs::File::open(path)?;
        let lookup = Self::from_reader(file)?;
        log::info!(
            "Loaded {} postcode prefixes from {}",
            lookup.len(),
            path.display()
        );
        Ok(lookup)
    }

    /// Builds the lookup table from CSV data.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the data is not valid CSV, has no `postcode`
    /// column, or has neither a `municipality` nor a `province` column.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, GeoError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let postcode_col = headers.iter().position(|h| h == "postcode").ok_or_else(|| {
            GeoError::Conversion {
                message: "postcode table is missing a \"postcode\" column".to_string(),
            }
        })?;
        let municipality_col = headers.iter().position(|h| h == "municipality");
        let province_col = headers.iter().position(|h| h == "province");
        if municipality_col.is_none() && province_col.is_none() {
            return Err(GeoError::Conversion {
                message: "postcode table needs a \"municipality\" or \"province\" column"
                    .to_string(),
            });
        }

        let mut map = BTreeMap::new();
        let mut duplicates = 0_usize;
        for row in csv_reader.records() {
            let row = row?;
            let Some(prefix) = row.get(postcode_col).filter(|p| !p.is_empty()) else {
                continue;
            };
            if map.contains_key(prefix) {
                duplicates += 1;
                continue;
            }
            map.insert(
                prefix.to_string(),
                PostcodeAreas {
                    municipality: cell(&row, municipality_col),
                    province: cell(&row, province_col),
                },
            );
        }
        if duplicates > 0 {
            log::warn!("Dropped {duplicates} duplicate postcode prefixes (first row wins)");
        }

        Ok(Self { map })
    }

    /// The areas for a 4-digit prefix.
    #[must_use]
    pub fn lookup(&self, prefix: &str) -> Option<&PostcodeAreas> {
        self.map.get(prefix)
    }

    /// Number of distinct prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table holds no prefixes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn cell(row: &csv::StringRecord, col: Option<usize>) -> Option<String> {
    let value = row.get(col?)?;
    (!value.is_empty()).then(|| value.to_string())
}
