#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Material category trees.
//!
//! A [`TreeBuilder`] folds resolved material paths into one
//! insertion-ordered tree while accounting weights in a flat
//! name-to-kilograms map. [`ops`] merges trees, resets them to reusable
//! skeletons and closes them bottom-up against such a map; [`export`]
//! renders the closed result as nested JSON, flow-diagram links or flat
//! table rows.
//!
//! Keeping shape and weight separate is what lets two record sources
//! (goods and waste) share one merged skeleton yet stay independently
//! closable, without a tree copy per source.

pub mod builder;
pub mod export;
pub mod node;
pub mod ops;

pub use builder::TreeBuilder;
pub use node::{CategoryNode, Children};
