//! Strips stray point parts out of mixed geometry collections.
//!
//! A handful of states ship district shapes as GeometryCollections that mix
//! polygons with degenerate points. Merge and simplification tools choke on
//! those, so the polygonal parts are folded into a single MultiPolygon.

use crate::collection::{read_collection, write_collection};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use geo::{MultiPolygon, Polygon};
use geojson::{FeatureCollection, Geometry as GeoJsonGeometry, Value as GeoJsonValue};
use std::fs;
use std::path::Path;
use tracing::info;

/// States whose raw shapes carry point parts.
pub const POINTS_STATES: [&str; 8] = ["DE", "NJ", "LA", "MD", "NC", "OH", "PR", "MS"];

pub fn needs_depointing(abbr: &str) -> bool {
    POINTS_STATES.contains(&abbr)
}

/// Leading state token of a `{abbr}-{region}.geojson` file name.
pub fn state_prefix(path: &Path) -> Option<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.split('-').next())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepointOutcome {
    /// The file was rewritten; holds the number of rebuilt features.
    Cleaned(usize),
    /// The state is not in the exception set; the file was copied as is.
    Copied,
    Skipped,
}

fn polygon_parts(value: &GeoJsonValue) -> std::result::Result<Vec<Polygon<f64>>, geojson::Error> {
    match value {
        GeoJsonValue::Polygon(_) => Ok(vec![Polygon::<f64>::try_from(value.clone())?]),
        GeoJsonValue::MultiPolygon(_) => Ok(MultiPolygon::<f64>::try_from(value.clone())?.0),
        _ => Ok(Vec::new()),
    }
}

/// Rebuilds a GeometryCollection as a MultiPolygon of its polygonal parts.
/// Returns `None` for any other geometry type. A collection without
/// polygonal parts becomes an empty MultiPolygon.
pub fn depoint_geometry(
    geometry: &GeoJsonGeometry,
) -> std::result::Result<Option<GeoJsonGeometry>, geojson::Error> {
    let GeoJsonValue::GeometryCollection(parts) = &geometry.value else {
        return Ok(None);
    };
    let mut polygons = Vec::new();
    for part in parts {
        polygons.extend(polygon_parts(&part.value)?);
    }
    let multi = MultiPolygon::new(polygons);
    Ok(Some(GeoJsonGeometry::new(GeoJsonValue::from(&multi))))
}

/// Depoints every feature in place, returning how many were rebuilt.
pub fn depoint_collection(
    fc: &mut FeatureCollection,
) -> std::result::Result<usize, geojson::Error> {
    let mut rebuilt = 0;
    for feature in fc.features.iter_mut() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        if let Some(cleaned) = depoint_geometry(geometry)? {
            feature.geometry = Some(cleaned);
            rebuilt += 1;
        }
    }
    Ok(rebuilt)
}

/// Cleans `src` into `dst` if its state is in the exception set, otherwise
/// copies it byte for byte.
pub fn depoint_file(src: &Path, dst: &Path) -> Result<DepointOutcome> {
    let abbr = state_prefix(src).unwrap_or_default();
    info!(src = %src.display(), dst = %dst.display(), "depoint");

    if !needs_depointing(abbr) {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::copy(src, dst).map_err(|e| Error::io(src, e))?;
        return Ok(DepointOutcome::Copied);
    }

    let mut fc = read_collection(src)?;
    let rebuilt = depoint_collection(&mut fc).map_err(|e| Error::GeoJson {
        path: src.to_path_buf(),
        source: Box::new(e),
    })?;
    write_collection(dst, &fc)?;
    Ok(DepointOutcome::Cleaned(rebuilt))
}

/// Depoints `src` into `dst` unless the manifest says it is already done.
pub fn depoint_resumable(src: &Path, dst: &Path, manifest: &mut Manifest) -> Result<DepointOutcome> {
    if manifest.is_complete(src, dst)? {
        info!(dst = %dst.display(), "exists, skipping");
        return Ok(DepointOutcome::Skipped);
    }
    let outcome = depoint_file(src, dst)?;
    manifest.record(src, dst)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Feature;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn square(x: f64) -> serde_json::Value {
        json!([[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]])
    }

    fn geometry(value: serde_json::Value) -> GeoJsonGeometry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn drops_points_and_flattens_polygons() {
        let g = geometry(json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [0.0, 0.0]},
                {"type": "Polygon", "coordinates": square(0.0)},
                {"type": "MultiPolygon", "coordinates": [square(2.0), square(4.0)]},
            ]
        }));
        let cleaned = depoint_geometry(&g).unwrap().unwrap();
        match cleaned.value {
            GeoJsonValue::MultiPolygon(polys) => {
                assert_eq!(polys.len(), 3);
                assert_eq!(polys[0][0][0], vec![0.0, 0.0]);
                assert_eq!(polys[2][0][0], vec![4.0, 0.0]);
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn point_only_collection_becomes_empty_multipolygon() {
        let g = geometry(json!({
            "type": "GeometryCollection",
            "geometries": [{"type": "Point", "coordinates": [1.0, 1.0]}]
        }));
        let cleaned = depoint_geometry(&g).unwrap().unwrap();
        assert_eq!(cleaned.value, GeoJsonValue::MultiPolygon(vec![]));
    }

    #[test]
    fn plain_polygons_are_left_alone() {
        let g = geometry(json!({"type": "Polygon", "coordinates": square(0.0)}));
        assert!(depoint_geometry(&g).unwrap().is_none());
    }

    #[test]
    fn prefix_is_leading_state_token() {
        assert_eq!(state_prefix(&PathBuf::from("x/NJ-house.geojson")), Some("NJ"));
        assert!(needs_depointing("NJ"));
        assert!(!needs_depointing("FL"));
    }

    fn write_mixed(path: &Path) {
        let fc = FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry(json!({
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Point", "coordinates": [0.0, 0.0]},
                        {"type": "Polygon", "coordinates": square(0.0)},
                    ]
                }))),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        };
        fs::write(path, serde_json::to_string(&fc).unwrap()).unwrap();
    }

    #[test]
    fn exception_states_are_rewritten() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("DE-senate.geojson");
        let dst = dir.path().join("out/DE-senate.geojson");
        write_mixed(&src);

        assert_eq!(depoint_file(&src, &dst).unwrap(), DepointOutcome::Cleaned(1));
        let fc = read_collection(&dst).unwrap();
        let value = &fc.features[0].geometry.as_ref().unwrap().value;
        assert!(matches!(value, GeoJsonValue::MultiPolygon(p) if p.len() == 1));
    }

    #[test]
    fn other_states_are_copied_verbatim() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("FL-senate.geojson");
        let dst = dir.path().join("out/FL-senate.geojson");
        write_mixed(&src);

        assert_eq!(depoint_file(&src, &dst).unwrap(), DepointOutcome::Copied);
        assert_eq!(fs::read(&src).unwrap(), fs::read(&dst).unwrap());
    }
}
