#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Classification joins for flow records.
//!
//! Attaches categorical labels (material ontology, transition agenda,
//! industry, treatment-method group) to records by exact code lookup.
//! Codes are normalized on both sides of the join so numeric and string
//! spellings compare equal; records whose code is not in the table receive
//! the `"Onbekend"` sentinel and stay visible as a first-class bucket.

pub mod coefficient;
pub mod table;

use matflow_flow_models::{FlowRecord, Scheme};
use matflow_material_models::UNKNOWN;
use thiserror::Error;

use crate::table::ClassificationTable;

/// Width that all-digit codes are zero-padded to before matching.
pub const CODE_WIDTH: usize = 6;

/// Errors that can occur while loading classification tables.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Reading an input file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a CSV table failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Normalizes a classification code for table matching.
///
/// Trims whitespace, drops a trailing `.0` left behind by numeric
/// spreadsheet exports, and zero-pads all-digit codes to [`CODE_WIDTH`] so
/// `"170201"`, `"170201.0"` and `"17201"`-style truncations of the same
/// number compare equal. Codes containing letters pass through unchanged.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    let mut code = raw.trim();
    if let Some(stripped) = code.strip_suffix(".0") {
        if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit()) {
            code = stripped;
        }
    }
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) && code.len() < CODE_WIDTH {
        return format!("{code:0>width$}", width = CODE_WIDTH);
    }
    code.to_string()
}

/// Left-joins one classification scheme onto every record.
///
/// The code is read from the endpoint the scheme conventionally describes
/// ([`Scheme::code_role`]): waste codes on the origin side, processing codes
/// on the destination side. Lookup misses receive the exact
/// [`UNKNOWN`] sentinel, never an empty label, and are counted in one
/// warning per scheme so missing-data volume stays observable.
pub fn classify(records: &mut [FlowRecord], table: &ClassificationTable, scheme: Scheme) {
    let role = scheme.code_role();
    let mut misses = 0_usize;
    for record in records.iter_mut() {
        let label = match table.label(&record.endpoint(role).code, scheme) {
            Some(label) => label.to_string(),
            None => {
                misses += 1;
                UNKNOWN.to_string()
            }
        };
        record.labels.set(scheme, label);
    }
    if misses > 0 {
        log::warn!(
            "{misses}/{} records have no {scheme} classification; labeled {UNKNOWN:?}",
            records.len()
        );
    }
}
