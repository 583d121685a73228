//! Run configuration and the on-disk data layout.

use crate::district::Region;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResumePolicy {
    /// Skip a step when its output file exists, whatever it contains.
    Exists,
    /// Skip a step only when the manifest records the same input and
    /// output contents.
    #[default]
    Manifest,
}

impl std::str::FromStr for ResumePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exists" => Ok(ResumePolicy::Exists),
            "manifest" => Ok(ResumePolicy::Manifest),
            other => Err(format!("unknown resume policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Stages {
    pub convert: bool,
    pub normalize: bool,
    pub clip: bool,
    pub depoint: bool,
    pub reproject: bool,
    pub repair: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Stages {
            convert: true,
            normalize: true,
            clip: true,
            depoint: true,
            reproject: true,
            repair: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolPrograms {
    pub ogr2ogr: String,
    pub reproject: String,
    pub mapshaper: String,
}

impl Default for ToolPrograms {
    fn default() -> Self {
        ToolPrograms {
            ogr2ogr: "ogr2ogr".to_string(),
            reproject: "dirty-reproject".to_string(),
            mapshaper: "mapshaper".to_string(),
        }
    }
}

/// One family of shapefiles under `fetch/` to convert and normalize.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceSpec {
    /// Glob, relative to the fetch directory.
    pub pattern: String,
    #[serde(default)]
    pub whole_state: bool,
    /// Set for district-numbered single-state sources.
    #[serde(default)]
    pub state_fips: Option<String>,
    /// Attribute filter handed to the converter.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub regions: Vec<Region>,
    pub stages: Stages,
    pub resume: ResumePolicy,
    pub keep_clipped: bool,
    pub keep_depointed: bool,
    pub strict_repair: bool,
    pub boundary: PathBuf,
    pub projection: String,
    pub source_crs: String,
    pub decade_suffix: String,
    pub scores: Option<PathBuf>,
    pub tools: ToolPrograms,
    pub sources: Vec<SourceSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("../data/geospatial"),
            regions: Region::ALL.to_vec(),
            stages: Stages::default(),
            resume: ResumePolicy::default(),
            keep_clipped: false,
            keep_depointed: true,
            strict_repair: false,
            boundary: PathBuf::from("fetch/cb_2021_us_nation_5m.shp"),
            projection: "albersUsa".to_string(),
            source_crs: "crs:84".to_string(),
            decade_suffix: "20".to_string(),
            scores: None,
            tools: ToolPrograms::default(),
            sources: vec![
                SourceSpec {
                    pattern: "tl_*_sld[lu].shp".to_string(),
                    whole_state: false,
                    state_fips: None,
                    filter: None,
                },
                SourceSpec {
                    pattern: "tl_*_state*.shp".to_string(),
                    whole_state: true,
                    state_fips: None,
                    filter: None,
                },
            ],
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.data_dir)
    }

    pub fn boundary_path(&self) -> PathBuf {
        if self.boundary.is_absolute() {
            self.boundary.clone()
        } else {
            self.data_dir.join(&self.boundary)
        }
    }

    pub fn scores_path(&self) -> Option<PathBuf> {
        self.scores.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.data_dir.join(p)
            }
        })
    }
}

/// Fixed directory layout under the data root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn fetch(&self) -> PathBuf {
        self.root.join("fetch")
    }

    pub fn process(&self) -> PathBuf {
        self.root.join("process")
    }

    pub fn clipped(&self) -> PathBuf {
        self.root.join("clipped")
    }

    pub fn depointed(&self) -> PathBuf {
        self.root.join("depointed")
    }

    pub fn clean(&self) -> PathBuf {
        self.root.join("clean")
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Creates the per-region stage directories.
    pub fn create_dirs(&self, regions: &[Region]) -> Result<()> {
        for stage in [self.clipped(), self.depointed(), self.clean()] {
            for region in regions {
                let dir = stage.join(region.as_str());
                fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            }
        }
        Ok(())
    }
}
