//! Code-to-label classification tables.

use std::collections::BTreeMap;
use std::path::Path;

use matflow_flow_models::{ClassificationLabels, Scheme};

use crate::{ClassifyError, normalize_code};

/// A code-to-label lookup covering one or more classification schemes.
///
/// Loaded once per run from a `;`-delimited CSV with a `code` column plus a
/// column per provided scheme (`material`, `agenda`, `industry`,
/// `treatment`). Waste-code tables typically carry the first three;
/// processing-code tables carry `treatment`. Static and immutable after
/// loading.
pub struct ClassificationTable {
    rows: BTreeMap<String, ClassificationLabels>,
    schemes: Vec<Scheme>,
}

impl ClassificationTable {
    /// Loads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the file cannot be read, is not valid
    /// CSV, or lacks the required columns.
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        log::info!(
            "Loaded {} classification codes covering {} schemes from {}",
            table.len(),
            table.schemes().len(),
            path.display()
        );
        Ok(table)
    }

    /// Builds the table from CSV data.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the data is not valid CSV, has no `code`
    /// column, or has no recognized scheme column at all.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, ClassifyError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let code_col = headers.iter().position(|h| h == "code").ok_or_else(|| {
            ClassifyError::Conversion {
                message: "classification table is missing a \"code\" column".to_string(),
            }
        })?;

        let mut scheme_cols: Vec<(Scheme, usize)> = Vec::new();
        for &scheme in Scheme::all() {
            let column = scheme.as_ref().to_lowercase();
            if let Some(idx) = headers.iter().position(|h| h == column) {
                scheme_cols.push((scheme, idx));
            }
        }
        if scheme_cols.is_empty() {
            return Err(ClassifyError::Conversion {
                message: "classification table has no recognized scheme columns".to_string(),
            });
        }

        let mut rows = BTreeMap::new();
        for row in csv_reader.records() {
            let row = row?;
            let Some(code) = row.get(code_col).filter(|c| !c.is_empty()) else {
                continue;
            };
            let mut labels = ClassificationLabels::default();
            for &(scheme, idx) in &scheme_cols {
                if let Some(label) = row.get(idx).filter(|l| !l.is_empty()) {
                    labels.set(scheme, label.to_string());
                }
            }
            rows.insert(normalize_code(code), labels);
        }

        Ok(Self {
            rows,
            schemes: scheme_cols.iter().map(|&(scheme, _)| scheme).collect(),
        })
    }

    /// The label attached to a code under one scheme, if present.
    #[must_use]
    pub fn label(&self, code: &str, scheme: Scheme) -> Option<&str> {
        self.rows.get(&normalize_code(code))?.get(scheme)
    }

    /// The schemes this table provides labels for.
    #[must_use]
    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    /// Number of distinct codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
