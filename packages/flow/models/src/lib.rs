#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical flow-record format shared across the matflow pipeline.
//!
//! Every input source (waste registry extracts, national trade tables)
//! normalizes its rows into [`FlowRecord`] at read time. Joins enrich the
//! record in place; aggregation reads it through typed [`Dimension`]
//! accessors instead of dynamically formatted column names.

use matflow_material_models::MaterialTag;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of leading digits used by postcode lookup tables.
pub const POSTCODE_PREFIX_LEN: usize = 4;

/// Which endpoint of a movement a join or dimension refers to.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Where the material left (producer/exporter side).
    Origin,
    /// Where the material arrived (processor/importer side).
    Destination,
}

impl Role {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Origin, Self::Destination]
    }
}

/// Administrative level of an area assignment.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminLevel {
    /// Municipality ("gemeente").
    Municipality,
    /// Province.
    Province,
}

impl AdminLevel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Municipality, Self::Province]
    }
}

/// Classification scheme attached to a record by code lookup.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Scheme {
    /// Material ontology group (keyed on the waste code).
    Material,
    /// Transition agenda (keyed on the waste code).
    Agenda,
    /// Producing industry group (keyed on the waste code).
    Industry,
    /// Treatment-method group (keyed on the processing code).
    Treatment,
}

impl Scheme {
    /// The endpoint whose code this scheme is conventionally joined on:
    /// material/agenda/industry describe what was discarded (origin side),
    /// treatment describes what happened to it (destination side).
    #[must_use]
    pub const fn code_role(self) -> Role {
        match self {
            Self::Material | Self::Agenda | Self::Industry => Role::Origin,
            Self::Treatment => Role::Destination,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Material, Self::Agenda, Self::Industry, Self::Treatment]
    }
}

/// Reporting period of a movement. Months are optional because several
/// sources only publish yearly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    /// Calendar year.
    pub year: u16,
    /// Calendar month (1-12), when the source provides it.
    pub month: Option<u8>,
}

/// Where an endpoint of a movement is located.
///
/// Malformed location fields normalize to [`Location::Unknown`] at read time
/// rather than erroring; area resolution then leaves the record's area tags
/// empty and it surfaces downstream as an unknown-area bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    /// A point position (WGS84).
    Coordinates {
        /// Longitude in decimal degrees.
        longitude: f64,
        /// Latitude in decimal degrees.
        latitude: f64,
    },
    /// A postal code, e.g. `"1234 AB"`.
    Postcode(String),
    /// Missing or unparseable location.
    Unknown,
}

impl Location {
    /// The leading-digit prefix used for postcode lookups, when this
    /// location is a postcode with at least [`POSTCODE_PREFIX_LEN`] digits.
    #[must_use]
    pub fn postcode_prefix(&self) -> Option<&str> {
        let Self::Postcode(code) = self else {
            return None;
        };
        let trimmed = code.trim();
        let digits = trimmed
            .as_bytes()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        (digits >= POSTCODE_PREFIX_LEN).then(|| &trimmed[..POSTCODE_PREFIX_LEN])
    }
}

/// Administrative-area names attached to an endpoint by area resolution.
/// `None` means the endpoint fell outside every known area (or had no
/// usable location), never that resolution was skipped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTags {
    /// Municipality name, if resolved.
    pub municipality: Option<String>,
    /// Province name, if resolved.
    pub province: Option<String>,
}

impl AreaTags {
    /// The area name at the given level.
    #[must_use]
    pub fn get(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Municipality => self.municipality.as_deref(),
            AdminLevel::Province => self.province.as_deref(),
        }
    }

    /// Sets the area name at the given level.
    pub fn set(&mut self, level: AdminLevel, name: Option<String>) {
        match level {
            AdminLevel::Municipality => self.municipality = name,
            AdminLevel::Province => self.province = name,
        }
    }
}

/// One side of a movement: its classification code, location, and resolved
/// area assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Raw classification code as read from the source (waste code on the
    /// origin side, processing code on the destination side). Zero-padding
    /// happens at lookup time, not here.
    pub code: String,
    /// Point or postcode location of this endpoint.
    pub location: Location,
    /// Area names filled in by area resolution.
    pub area: AreaTags,
}

impl Endpoint {
    /// An endpoint with only a code, before any location data is attached.
    #[must_use]
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            location: Location::Unknown,
            area: AreaTags::default(),
        }
    }
}

/// Per-scheme labels attached by classification joins. `None` means the
/// scheme has not been joined yet; after a join the slot always holds a
/// label (the `"Onbekend"` sentinel on a lookup miss).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationLabels {
    /// Material ontology group.
    pub material: Option<String>,
    /// Transition agenda.
    pub agenda: Option<String>,
    /// Producing industry group.
    pub industry: Option<String>,
    /// Treatment-method group.
    pub treatment: Option<String>,
}

impl ClassificationLabels {
    /// The label for the given scheme.
    #[must_use]
    pub fn get(&self, scheme: Scheme) -> Option<&str> {
        match scheme {
            Scheme::Material => self.material.as_deref(),
            Scheme::Agenda => self.agenda.as_deref(),
            Scheme::Industry => self.industry.as_deref(),
            Scheme::Treatment => self.treatment.as_deref(),
        }
    }

    /// Sets the label for the given scheme.
    pub fn set(&mut self, scheme: Scheme, label: String) {
        match scheme {
            Scheme::Material => self.material = Some(label),
            Scheme::Agenda => self.agenda = Some(label),
            Scheme::Industry => self.industry = Some(label),
            Scheme::Treatment => self.treatment = Some(label),
        }
    }
}

/// Position of a movement relative to a focus area: both endpoints inside,
/// inbound, outbound, or entirely elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowScope {
    /// Origin and destination both inside the focus area.
    Internal,
    /// Import: origin outside, destination inside.
    Incoming,
    /// Export: origin inside, destination outside.
    Outgoing,
    /// Neither endpoint inside the focus area.
    External,
}

/// One administrative waste or goods movement, normalized from a source row.
///
/// Read once per yearly batch, enriched in place by the area and
/// classification joins, then discarded after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRecord {
    /// Weight of the movement in kilograms. Non-negative.
    pub weight_kg: f64,
    /// Reporting period.
    pub period: Period,
    /// Producer/exporter side.
    pub origin: Endpoint,
    /// Processor/importer side.
    pub destination: Endpoint,
    /// Parsed material taxonomy tag. `None` when the source row had no
    /// usable taxonomy string (logged at read time as a quality signal).
    pub materials: Option<MaterialTag>,
    /// Labels attached by classification joins.
    pub labels: ClassificationLabels,
}

impl FlowRecord {
    /// The endpoint for the given role.
    #[must_use]
    pub const fn endpoint(&self, role: Role) -> &Endpoint {
        match role {
            Role::Origin => &self.origin,
            Role::Destination => &self.destination,
        }
    }

    /// Mutable access to the endpoint for the given role.
    pub const fn endpoint_mut(&mut self, role: Role) -> &mut Endpoint {
        match role {
            Role::Origin => &mut self.origin,
            Role::Destination => &mut self.destination,
        }
    }

    /// Classifies this movement relative to a focus area at the given
    /// administrative level.
    #[must_use]
    pub fn scope(&self, focus_area: &str, level: AdminLevel) -> FlowScope {
        let origin_in = self.origin.area.get(level) == Some(focus_area);
        let destination_in = self.destination.area.get(level) == Some(focus_area);
        match (origin_in, destination_in) {
            (true, true) => FlowScope::Internal,
            (false, true) => FlowScope::Incoming,
            (true, false) => FlowScope::Outgoing,
            (false, false) => FlowScope::External,
        }
    }
}

/// A typed group-by dimension, replacing dynamically formatted column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Resolved area name for one endpoint at one administrative level.
    Area {
        /// Which endpoint to read.
        role: Role,
        /// Which administrative level to read.
        level: AdminLevel,
    },
    /// Label attached by the given classification scheme.
    Scheme(Scheme),
    /// Calendar year of the movement.
    Year,
}

impl Dimension {
    /// The dimension value for one record, or `None` when the record has no
    /// assignment (unresolved area, scheme not joined). Callers bucket
    /// `None` under the unknown sentinel rather than dropping the record.
    #[must_use]
    pub fn value(&self, record: &FlowRecord) -> Option<String> {
        match self {
            Self::Area { role, level } => record
                .endpoint(*role)
                .area
                .get(*level)
                .map(ToString::to_string),
            Self::Scheme(scheme) => record.labels.get(*scheme).map(ToString::to_string),
            Self::Year => Some(record.period.year.to_string()),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Area { role, level } => write!(f, "{role}_{level}"),
            Self::Scheme(scheme) => write!(f, "{scheme}"),
            Self::Year => f.write_str("YEAR"),
        }
    }
}
