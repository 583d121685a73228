#![allow(dead_code)]

use district_shapes::{Error, PipelineConfig, Result, Toolchain};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What the fake reprojection writes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Copy,
    /// Opens every ring, which fails validation.
    Broken,
}

/// Stands in for ogr2ogr, dirty-reproject and mapshaper. Every tool copies
/// its input to its output and logs the call.
pub struct FakeToolchain {
    pub calls: RefCell<Vec<String>>,
    pub projection: Projection,
    /// When false the repair leaves the geometry broken.
    pub repair_fixes: bool,
}

impl FakeToolchain {
    pub fn new() -> Self {
        FakeToolchain {
            calls: RefCell::new(Vec::new()),
            projection: Projection::Copy,
            repair_fixes: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, tool: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(tool))
            .count()
    }

    fn log(&self, tool: &str, src: &Path) {
        let name = src.file_name().unwrap().to_string_lossy();
        self.calls.borrow_mut().push(format!("{} {}", tool, name));
    }
}

fn open_rings(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&json!("Polygon")) {
                if let Some(Value::Array(rings)) = map.get_mut("coordinates") {
                    for ring in rings {
                        if let Value::Array(points) = ring {
                            points.pop();
                        }
                    }
                }
            } else {
                for v in map.values_mut() {
                    open_rings(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(open_rings),
        _ => {}
    }
}

impl Toolchain for FakeToolchain {
    fn convert(&self, src: &Path, dst: &Path, _crs: &str, _filter: Option<&str>) -> Result<()> {
        self.log("convert", src);
        fs::copy(src, dst).unwrap();
        Ok(())
    }

    fn clip(&self, _boundary: &Path, src: &Path, dst: &Path) -> Result<()> {
        self.log("clip", src);
        // ogr2ogr's GeoJSON driver will not overwrite an existing file
        if dst.exists() {
            return Err(Error::ToolFailed {
                program: "ogr2ogr".into(),
                status: "destination exists".into(),
            });
        }
        fs::copy(src, dst).unwrap();
        Ok(())
    }

    fn reproject(&self, src: &Path, dst: &Path, _projection: &str) -> Result<()> {
        self.log("reproject", src);
        let mut value: Value = serde_json::from_str(&fs::read_to_string(src).unwrap()).unwrap();
        if self.projection == Projection::Broken {
            open_rings(&mut value);
        }
        fs::write(dst, value.to_string()).unwrap();
        Ok(())
    }

    fn repair(&self, src: &Path, dst: &Path) -> Result<()> {
        self.log("repair", src);
        let mut value: Value = serde_json::from_str(&fs::read_to_string(src).unwrap()).unwrap();
        if self.repair_fixes {
            close_rings(&mut value);
        }
        fs::write(dst, value.to_string()).unwrap();
        Ok(())
    }
}

fn close_rings(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&json!("Polygon")) {
                if let Some(Value::Array(rings)) = map.get_mut("coordinates") {
                    for ring in rings {
                        if let Value::Array(points) = ring {
                            if let Some(first) = points.first().cloned() {
                                points.push(first);
                            }
                        }
                    }
                }
            } else {
                for v in map.values_mut() {
                    close_rings(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_rings),
        _ => {}
    }
}

pub fn square(x: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]
    })
}

pub fn feature(geometry: Value, properties: Value) -> Value {
    json!({"type": "Feature", "geometry": geometry, "properties": properties})
}

pub fn collection(features: Vec<Value>) -> Value {
    json!({"type": "FeatureCollection", "features": features})
}

pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().join("geospatial");
        for dir in ["fetch", "process"] {
            fs::create_dir_all(root.join(dir)).expect("create data dir");
        }
        fs::write(root.join("fetch/cb_2021_us_nation_5m.shp"), "boundary")
            .expect("write boundary");
        TestEnv { _tmp: tmp, root }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.root.clone(),
            ..PipelineConfig::default()
        }
    }

    pub fn write(&self, rel: &str, value: &Value) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> Value {
        let text = fs::read_to_string(self.root.join(rel)).expect("read output");
        serde_json::from_str(&text).expect("valid json")
    }

    /// A Florida upper-chamber TIGER file and a New Jersey lower-chamber
    /// file whose only district mixes a point into its geometry.
    pub fn seed_fetch(&self) {
        self.write(
            "fetch/tl_2022_12_sldu.shp",
            &collection(vec![
                feature(
                    square(0.0),
                    json!({"STATEFP": "12", "GEOID": "12001", "LSAD": "LU",
                           "NAMELSAD": "District 1", "SLDUST": "001", "ALAND": 10}),
                ),
                feature(
                    square(2.0),
                    json!({"STATEFP": "12", "GEOID": "12002", "LSAD": "LU",
                           "NAMELSAD": "District 2", "SLDUST": "002", "ALAND": 20}),
                ),
            ]),
        );
        self.write(
            "fetch/tl_2022_34_sldl.shp",
            &collection(vec![feature(
                json!({"type": "GeometryCollection", "geometries": [
                    {"type": "Point", "coordinates": [9.0, 9.0]},
                    square(4.0),
                ]}),
                json!({"STATEFP": "34", "GEOID": "34005", "LSAD": "LL",
                       "NAMELSAD": "Assembly District 5", "SLDLST": "005"}),
            )]),
        );
    }
}
