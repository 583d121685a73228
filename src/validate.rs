//! Structural validity checks for GeoJSON geometries.
//!
//! Forward projection occasionally emits non-finite ordinates or collapsed
//! rings for some chambers. Those files get a repair pass afterwards.

use crate::collection::read_collection;
use crate::error::Result;
use geojson::{FeatureCollection, Geometry, Value};
use std::path::Path;

fn position_ok(p: &[f64]) -> bool {
    p.len() >= 2 && p.iter().all(|c| c.is_finite())
}

fn line_ok(line: &[Vec<f64>]) -> bool {
    line.len() >= 2 && line.iter().all(|p| position_ok(p))
}

fn ring_ok(ring: &[Vec<f64>]) -> bool {
    ring.len() >= 4 && line_ok(ring) && ring.first() == ring.last()
}

fn polygon_ok(rings: &[Vec<Vec<f64>>]) -> bool {
    rings.iter().all(|r| ring_ok(r))
}

pub fn is_valid_geometry(geometry: &Geometry) -> bool {
    is_valid_value(&geometry.value)
}

fn is_valid_value(value: &Value) -> bool {
    match value {
        Value::Point(p) => position_ok(p),
        Value::MultiPoint(ps) => ps.iter().all(|p| position_ok(p)),
        Value::LineString(line) => line_ok(line),
        Value::MultiLineString(lines) => lines.iter().all(|l| line_ok(l)),
        Value::Polygon(rings) => polygon_ok(rings),
        Value::MultiPolygon(polys) => polys.iter().all(|p| polygon_ok(p)),
        Value::GeometryCollection(parts) => parts.iter().all(is_valid_geometry),
    }
}

/// Index of the first feature whose geometry fails validation.
pub fn first_invalid(fc: &FeatureCollection) -> Option<usize> {
    fc.features.iter().position(|f| {
        f.geometry
            .as_ref()
            .map(|g| !is_valid_geometry(g))
            .unwrap_or(false)
    })
}

/// Loads `path` and checks every feature. Unreadable files are errors
/// rather than invalid geometry.
pub fn is_valid_file(path: &Path) -> Result<bool> {
    let fc = read_collection(path)?;
    Ok(first_invalid(&fc).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn geometry(value: serde_json::Value) -> Geometry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn closed_polygon_is_valid() {
        let g = geometry(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        assert!(is_valid_geometry(&g));
    }

    #[test]
    fn open_ring_is_invalid() {
        let g = geometry(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]
        }));
        assert!(!is_valid_geometry(&g));
    }

    #[test]
    fn short_ring_is_invalid() {
        let g = geometry(json!({
            "type": "MultiPolygon",
            "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]]
        }));
        assert!(!is_valid_geometry(&g));
    }

    #[test]
    fn non_finite_positions_are_invalid() {
        let g = Geometry::new(Value::Point(vec![f64::NAN, 1.0]));
        assert!(!is_valid_geometry(&g));
        let g = Geometry::new(Value::LineString(vec![vec![0.0, 0.0], vec![f64::INFINITY, 1.0]]));
        assert!(!is_valid_geometry(&g));
    }

    #[test]
    fn collections_are_checked_recursively() {
        let g = Geometry::new(Value::GeometryCollection(vec![
            Geometry::new(Value::Point(vec![0.0, 0.0])),
            Geometry::new(Value::LineString(vec![vec![0.0, 0.0]])),
        ]));
        assert!(!is_valid_geometry(&g));
    }
}
