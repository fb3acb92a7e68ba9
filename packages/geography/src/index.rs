//! In-memory spatial index for area attribution.
//!
//! Wraps the loaded polygons in an R-tree so the per-record point-in-polygon
//! join stays cheap even with thousands of municipality boundaries.

use geo::{Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::AreaPolygon;

/// An area polygon stored in the R-tree with its metadata.
struct AreaEntry {
    name: String,
    parent: Option<String>,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for AreaEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A located area: the containing polygon's name plus its parent area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaMatch<'a> {
    /// Name of the containing polygon.
    pub name: &'a str,
    /// Parent-area name (e.g. the municipality's province), when known.
    pub parent: Option<&'a str>,
}

/// Pre-built spatial index for point-in-polygon area lookups.
///
/// Constructed once per run from the loaded [`AreaPolygon`]s and shared by
/// every resolution pass.
pub struct AreaIndex {
    tree: RTree<AreaEntry>,
}

impl AreaIndex {
    /// Builds the index from loaded polygons.
    #[must_use]
    pub fn from_polygons(polygons: Vec<AreaPolygon>) -> Self {
        let entries = polygons
            .into_iter()
            .map(|area| {
                let envelope = compute_envelope(&area.geometry);
                AreaEntry {
                    name: area.name,
                    parent: area.parent,
                    envelope,
                    polygon: area.geometry,
                }
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Looks up the area containing a point.
    ///
    /// Administrative areas tile the territory without overlap, so the first
    /// polygon containing the point wins (left-join semantics). Points
    /// outside every polygon yield `None`.
    #[must_use]
    pub fn locate(&self, longitude: f64, latitude: f64) -> Option<AreaMatch<'_>> {
        let point = geo::Point::new(longitude, latitude);
        let query_env = AABB::from_point([longitude, latitude]);

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.contains(&point) {
                return Some(AreaMatch {
                    name: &entry.name,
                    parent: entry.parent.as_deref(),
                });
            }
        }
        None
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
