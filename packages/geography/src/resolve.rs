//! Attaches resolved area names to flow-record endpoints.
//!
//! Both resolution modes behave as left joins: a record that matches nothing
//! keeps `None` in its area tags and flows on, so one bad location never
//! aborts a batch.

use matflow_flow_models::{AdminLevel, FlowRecord, Location, Role};

use crate::index::AreaIndex;
use crate::postcode::PostcodeLookup;

/// Fills the `(role, level)` area tag of every record by point-in-polygon
/// lookup. When the indexed polygons carry parent references and `level` is
/// the municipality, the province tag is filled from the parent in the same
/// pass.
pub fn resolve_spatial(
    records: &mut [FlowRecord],
    index: &AreaIndex,
    role: Role,
    level: AdminLevel,
) {
    let mut resolved = 0_usize;
    for record in records.iter_mut() {
        let Location::Coordinates {
            longitude,
            latitude,
        } = record.endpoint(role).location
        else {
            continue;
        };
        let Some(found) = index.locate(longitude, latitude) else {
            continue;
        };
        let name = found.name.to_string();
        let parent = found.parent.map(ToString::to_string);

        let endpoint = record.endpoint_mut(role);
        endpoint.area.set(level, Some(name));
        if level == AdminLevel::Municipality && parent.is_some() {
            endpoint.area.set(AdminLevel::Province, parent);
        }
        resolved += 1;
    }
    log::info!(
        "Spatial join resolved {resolved}/{} {role} endpoints at {level}",
        records.len()
    );
}

/// Fills the municipality and province tags of every record from its
/// postcode prefix. Records without a usable 4-digit prefix, or with a
/// prefix absent from the table, keep `None`.
pub fn resolve_postcode(records: &mut [FlowRecord], lookup: &PostcodeLookup, role: Role) {
    let mut resolved = 0_usize;
    for record in records.iter_mut() {
        let Some(areas) = record
            .endpoint(role)
            .location
            .postcode_prefix()
            .and_then(|prefix| lookup.lookup(prefix))
        else {
            continue;
        };
        let municipality = areas.municipality.clone();
        let province = areas.province.clone();

        let endpoint = record.endpoint_mut(role);
        if municipality.is_some() {
            endpoint.area.set(AdminLevel::Municipality, municipality);
        }
        if province.is_some() {
            endpoint.area.set(AdminLevel::Province, province);
        }
        resolved += 1;
    }
    log::info!(
        "Postcode lookup resolved {resolved}/{} {role} endpoints",
        records.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AreaPolygon;
    use geo::{LineString, MultiPolygon, Polygon};
    use matflow_flow_models::{ClassificationLabels, Endpoint, Period};

    fn record(location: Location) -> FlowRecord {
        FlowRecord {
            weight_kg: 100.0,
            period: Period {
                year: 2022,
                month: None,
            },
            origin: Endpoint {
                code: "170201".to_string(),
                location,
                area: matflow_flow_models::AreaTags::default(),
            },
            destination: Endpoint::from_code("B04"),
            materials: None,
            labels: ClassificationLabels::default(),
        }
    }

    fn utrecht_index() -> AreaIndex {
        let ring = LineString::from(vec![
            (4.0, 52.0),
            (6.0, 52.0),
            (6.0, 53.0),
            (4.0, 53.0),
            (4.0, 52.0),
        ]);
        AreaIndex::from_polygons(vec![AreaPolygon {
            name: "Utrecht".to_string(),
            parent: Some("Utrecht (provincie)".to_string()),
            geometry: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }])
    }

    #[test]
    fn spatial_join_fills_municipality_and_parent_province() {
        let mut records = vec![record(Location::Coordinates {
            longitude: 5.1,
            latitude: 52.1,
        })];
        resolve_spatial(
            &mut records,
            &utrecht_index(),
            Role::Origin,
            AdminLevel::Municipality,
        );
        assert_eq!(records[0].origin.area.municipality.as_deref(), Some("Utrecht"));
        assert_eq!(
            records[0].origin.area.province.as_deref(),
            Some("Utrecht (provincie)")
        );
    }

    #[test]
    fn point_outside_polygons_stays_unresolved() {
        let mut records = vec![record(Location::Coordinates {
            longitude: 0.0,
            latitude: 0.0,
        })];
        resolve_spatial(
            &mut records,
            &utrecht_index(),
            Role::Origin,
            AdminLevel::Municipality,
        );
        assert_eq!(records[0].origin.area.municipality, None);
        assert_eq!(records[0].origin.area.province, None);
    }

    #[test]
    fn unknown_location_stays_unresolved() {
        let mut records = vec![record(Location::Unknown)];
        resolve_spatial(
            &mut records,
            &utrecht_index(),
            Role::Origin,
            AdminLevel::Municipality,
        );
        assert_eq!(records[0].origin.area.municipality, None);
    }

    #[test]
    fn postcode_lookup_fills_both_levels() {
        let lookup = PostcodeLookup::from_reader(
            "postcode;municipality;province\n3511;Utrecht;Utrecht (provincie)\n".as_bytes(),
        )
        .unwrap();
        let mut records = vec![
            record(Location::Postcode("3511 AD".to_string())),
            record(Location::Postcode("9999 ZZ".to_string())),
        ];
        resolve_postcode(&mut records, &lookup, Role::Origin);
        assert_eq!(records[0].origin.area.municipality.as_deref(), Some("Utrecht"));
        assert_eq!(
            records[0].origin.area.province.as_deref(),
            Some("Utrecht (provincie)")
        );
        assert_eq!(records[1].origin.area.municipality, None);
    }
}
