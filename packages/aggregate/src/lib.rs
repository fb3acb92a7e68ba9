#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weight aggregation over classified flow records.
//!
//! Groups records by typed dimensions, sums weights, zero-fills the
//! combinations a caller declares as expected, and derives percentage
//! results against a reference aggregation. All amounts are converted from
//! kilograms to the requested output unit at this boundary; everything
//! upstream works in kilograms.

pub mod tools;
pub mod unit;

pub use unit::WeightUnit;
