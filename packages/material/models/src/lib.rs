#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Material taxonomy types shared across the matflow system.
//!
//! Registry rows carry a multi-label taxonomy string: `&` separates
//! alternative labels for mixed materials, `,` separates the hierarchical
//! path segments within one label (root-most first, e.g.
//! `"Organisch,Biotisch,Hout"`). These types parse that grammar once at
//! ingestion so every later stage works with structured paths instead of
//! re-splitting strings.

use serde::{Deserialize, Serialize};

/// Sentinel category for records whose code or taxonomy could not be matched.
///
/// This is a first-class category in every output, not a missing value, so
/// the volume of unclassifiable data stays visible on the dashboard.
pub const UNKNOWN: &str = "Onbekend";

/// Root-level leaf for mixed records whose labels share no common ancestor.
pub const MIXED: &str = "Gemengd";

/// Suffix appended to a shared ancestor name to form a mixed-material leaf.
pub const MIXED_SUFFIX: &str = " (gemengd)";

/// Suffix appended to a leaf name that collides with an internal node name.
pub const OTHER_SUFFIX: &str = " (andere)";

/// Suffixes left behind by the source workbook templates, stripped during
/// display normalization.
const TEMPLATE_SUFFIXES: &[&str] = &["_template", "_tabel"];

/// Returns the mixed-material leaf name for a shared ancestor category.
#[must_use]
pub fn mixed_name(name: &str) -> String {
    format!("{name}{MIXED_SUFFIX}")
}

/// Returns the collision-fallback leaf name for a category.
#[must_use]
pub fn other_name(name: &str) -> String {
    format!("{name}{OTHER_SUFFIX}")
}

/// Normalizes a raw taxonomy segment into its display name.
///
/// Expands `CamelCase` boundaries into spaced words (the registry encodes
/// category names without spaces, e.g. `"VoedselEnGroenreststromen"`) and
/// strips known template suffixes. The result doubles as the node key in
/// category trees, so normalization must happen before any tree insertion.
#[must_use]
pub fn display_name(raw: &str) -> String {
    let mut trimmed = raw.trim();
    for suffix in TEMPLATE_SUFFIXES {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            trimmed = stripped.trim_end();
            break;
        }
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(trimmed.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            // A boundary is lower/digit followed by upper, or the last upper
            // of an acronym run followed by a lowercase tail.
            let boundary = prev.is_lowercase()
                || prev.is_numeric()
                || (prev.is_uppercase() && chars.get(i + 1).is_some_and(|next| next.is_lowercase()));
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

/// Error returned when a raw material-taxonomy string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The raw string was empty or whitespace-only.
    Empty,
    /// A label contained an empty path segment.
    BlankSegment {
        /// The label in which the blank segment occurred.
        label: String,
    },
}

impl std::fmt::Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty material tag"),
            Self::BlankSegment { label } => {
                write!(f, "blank segment in material label {label:?}")
            }
        }
    }
}

impl std::error::Error for TagError {}

/// One hierarchical category path, root-most segment first, with every
/// segment already display-normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialPath(Vec<String>);

impl MaterialPath {
    /// Creates a path from already-normalized segments.
    #[must_use]
    pub const fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// The ordered segments, root-most first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The most specific segment, which receives the record's weight.
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether the path contains the given segment at any depth.
    #[must_use]
    pub fn contains(&self, segment: &str) -> bool {
        self.0.iter().any(|s| s == segment)
    }
}

impl std::fmt::Display for MaterialPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// A parsed multi-label material tag: one label for a pure record, several
/// for a mixed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTag {
    labels: Vec<MaterialPath>,
}

impl MaterialTag {
    /// Parses the raw `&`-and-`,` grammar into normalized labels.
    ///
    /// # Errors
    ///
    /// * [`TagError::Empty`] when the string is empty or whitespace-only.
    /// * [`TagError::BlankSegment`] when any label contains an empty segment
    ///   (e.g. `"A,,B"`), since a blank tree key would corrupt the hierarchy.
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        if raw.trim().is_empty() {
            return Err(TagError::Empty);
        }
        let labels = raw
            .split('&')
            .map(parse_label)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { labels })
    }

    /// The alternative labels, in input order.
    #[must_use]
    pub fn labels(&self) -> &[MaterialPath] {
        &self.labels
    }

    /// Whether this tag carries more than one alternative label.
    #[must_use]
    pub fn is_mixed(&self) -> bool {
        self.labels.len() > 1
    }

    /// Whether this tag inserts a single root-level name. Usually a sign of
    /// incomplete source data, worth surfacing as a quality signal.
    #[must_use]
    pub fn is_single_segment(&self) -> bool {
        matches!(self.labels.as_slice(), [only] if only.segments().len() == 1)
    }

    /// The common ancestor path of all labels: the first label's segments,
    /// in order, keeping only those present in every other label.
    #[must_use]
    pub fn common_path(&self) -> Vec<String> {
        let Some((first, rest)) = self.labels.split_first() else {
            return Vec::new();
        };
        first
            .segments()
            .iter()
            .filter(|segment| rest.iter().all(|label| label.contains(segment)))
            .cloned()
            .collect()
    }

    /// Whether any later label orders the shared segments differently from
    /// the first label. The intersection still follows the first label's
    /// order, but callers should surface the disagreement instead of
    /// truncating silently.
    #[must_use]
    pub fn labels_disagree(&self) -> bool {
        let Some((first, rest)) = self.labels.split_first() else {
            return false;
        };
        rest.iter().any(|label| {
            let in_first: Vec<&str> = first
                .segments()
                .iter()
                .filter(|s| label.contains(s))
                .map(String::as_str)
                .collect();
            let in_label: Vec<&str> = label
                .segments()
                .iter()
                .filter(|s| first.contains(s))
                .map(String::as_str)
                .collect();
            in_first != in_label
        })
    }

    /// The tree insertion path for this tag.
    ///
    /// A single label is used directly (its last segment is the leaf). A
    /// mixed tag resolves to its common ancestor path plus a synthetic
    /// `"<ancestor> (gemengd)"` leaf, or to the root-level [`MIXED`] leaf
    /// when the labels share nothing. Parking mixed weight at the shared
    /// ancestor avoids both double counting and an arbitrary pick between
    /// the alternatives.
    #[must_use]
    pub fn resolved_path(&self) -> MaterialPath {
        if let [only] = self.labels.as_slice() {
            return only.clone();
        }
        let mut common = self.common_path();
        match common.last().cloned() {
            Some(last) => {
                common.push(mixed_name(&last));
                MaterialPath(common)
            }
            None => MaterialPath(vec![MIXED.to_string()]),
        }
    }
}

impl std::fmt::Display for MaterialTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .labels
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" & ");
        f.write_str(&joined)
    }
}

fn parse_label(raw: &str) -> Result<MaterialPath, TagError> {
    let mut segments = Vec::new();
    for part in raw.split(',') {
        let name = display_name(part);
        if name.is_empty() {
            return Err(TagError::BlankSegment {
                label: raw.trim().to_string(),
            });
        }
        segments.push(name);
    }
    Ok(MaterialPath(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_label() {
        let tag = MaterialTag::parse("Organisch,Biotisch,Hout").unwrap();
        assert!(!tag.is_mixed());
        assert_eq!(
            tag.resolved_path().segments(),
            &["Organisch", "Biotisch", "Hout"]
        );
        assert_eq!(tag.resolved_path().leaf(), Some("Hout"));
    }

    #[test]
    fn expands_camel_case_boundaries() {
        assert_eq!(
            display_name("VoedselEnGroenreststromen"),
            "Voedsel En Groenreststromen"
        );
        assert_eq!(display_name("Hout"), "Hout");
        assert_eq!(display_name("CO2Impact"), "CO2 Impact");
        assert_eq!(display_name("ABSKunststof"), "ABS Kunststof");
    }

    #[test]
    fn strips_template_suffix() {
        assert_eq!(display_name("Bouwmaterialen_tabel"), "Bouwmaterialen");
        assert_eq!(display_name("Metalen_template"), "Metalen");
    }

    #[test]
    fn rejects_empty_tag() {
        assert_eq!(MaterialTag::parse(""), Err(TagError::Empty));
        assert_eq!(MaterialTag::parse("   "), Err(TagError::Empty));
    }

    #[test]
    fn rejects_blank_segment() {
        assert_eq!(
            MaterialTag::parse("Organisch,,Hout"),
            Err(TagError::BlankSegment {
                label: "Organisch,,Hout".to_string()
            })
        );
    }

    #[test]
    fn mixed_labels_share_common_ancestor() {
        let tag = MaterialTag::parse("Organisch,Biotisch,Hout&Organisch,Biotisch,Textiel").unwrap();
        assert!(tag.is_mixed());
        assert_eq!(tag.common_path(), &["Organisch", "Biotisch"]);
        assert_eq!(
            tag.resolved_path().segments(),
            &["Organisch", "Biotisch", "Biotisch (gemengd)"]
        );
    }

    #[test]
    fn disjoint_labels_resolve_to_root_mixed() {
        let tag = MaterialTag::parse("Organisch,Hout&Mineraal,Beton").unwrap();
        assert!(tag.common_path().is_empty());
        assert_eq!(tag.resolved_path().segments(), &[MIXED]);
    }

    #[test]
    fn intersection_keeps_first_label_order() {
        let tag = MaterialTag::parse("Mineraal,Beton,Grind&Grind,Beton,Mineraal").unwrap();
        assert_eq!(tag.common_path(), &["Mineraal", "Beton", "Grind"]);
        assert!(tag.labels_disagree());
    }

    #[test]
    fn agreeing_labels_do_not_flag() {
        let tag = MaterialTag::parse("Organisch,Biotisch,Hout&Organisch,Biotisch,Textiel").unwrap();
        assert!(!tag.labels_disagree());
    }

    #[test]
    fn single_segment_is_flagged() {
        let tag = MaterialTag::parse("Hout").unwrap();
        assert!(tag.is_single_segment());
        let deep = MaterialTag::parse("Organisch,Hout").unwrap();
        assert!(!deep.is_single_segment());
    }

    #[test]
    fn collision_and_mixed_name_helpers() {
        assert_eq!(other_name("Hout"), "Hout (andere)");
        assert_eq!(mixed_name("Biotisch"), "Biotisch (gemengd)");
    }

    #[test]
    fn tag_displays_original_grammar() {
        let tag = MaterialTag::parse("Organisch,Hout&Mineraal,Beton").unwrap();
        assert_eq!(tag.to_string(), "Organisch,Hout & Mineraal,Beton");
    }
}
