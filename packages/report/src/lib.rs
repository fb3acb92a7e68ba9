#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report assembly for regional material-flow statistics.
//!
//! This is the consumer crate of the workspace: a run loads one year of
//! flow records, resolves endpoint areas, joins classification labels,
//! computes the report indicators and writes a single JSON document that a
//! dashboard renders as-is. Per-record data problems are logged and folded
//! into sentinel buckets upstream; the errors here are the fatal kind that
//! abort a run (unreadable inputs, broken configuration).

pub mod config;
pub mod context;
pub mod indicators;
pub mod readers;
pub mod run;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run configuration does not parse.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Parsing a CSV input failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serializing the report failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Loading area reference data failed.
    #[error("Geography error: {0}")]
    Geo(#[from] matflow_geography::GeoError),

    /// Loading a classification table failed.
    #[error("Classification error: {0}")]
    Classify(#[from] matflow_classify::ClassifyError),

    /// A configured input file does not exist.
    #[error("Missing input file: {}", .path.display())]
    MissingInput {
        /// The path that was configured but not found.
        path: PathBuf,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
