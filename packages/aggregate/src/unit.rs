//! Weight units and the fixed divisor table.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Output unit for aggregated weights. Source data is always kilograms.
///
/// Parsed from configuration with [`std::str::FromStr`]; an unsupported
/// unit string fails there, at startup, never per record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum WeightUnit {
    /// Kilograms (no conversion).
    #[strum(serialize = "kg")]
    #[serde(rename = "kg")]
    Kilogram,
    /// Tonnes.
    #[strum(serialize = "t")]
    #[serde(rename = "t")]
    Tonne,
    /// Kilotonnes.
    #[strum(serialize = "kt")]
    #[serde(rename = "kt")]
    Kilotonne,
    /// Megatonnes.
    #[strum(serialize = "Mt")]
    #[serde(rename = "Mt")]
    Megatonne,
}

impl WeightUnit {
    /// Divisor applied to a kilogram value to express it in this unit.
    #[must_use]
    pub const fn divisor(self) -> f64 {
        match self {
            Self::Kilogram => 1.0,
            Self::Tonne => 1e3,
            Self::Kilotonne => 1e6,
            Self::Megatonne => 1e9,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Kilogram, Self::Tonne, Self::Kilotonne, Self::Megatonne]
    }
}

/// Converts a weight in kilograms to the requested unit. Pure and total.
#[must_use]
pub fn to_unit(weight_kg: f64, unit: WeightUnit) -> f64 {
    weight_kg / unit.divisor()
}
