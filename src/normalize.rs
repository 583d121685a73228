//! Shapefile to normalized GeoJSON.
//!
//! Each converted source file is read whole, every feature gets its
//! property set replaced by a [`DistrictProperties`] record, and the result
//! is written as one `{abbr}-{region}.geojson` per state under `process/`.
//! All features are derived before anything is written, so a bad attribute
//! leaves no partial output behind.

use crate::collection::{list_files, read_collection, write_collection};
use crate::config::{PipelineConfig, SourceSpec};
use crate::district::{self, Chamber, Scores, SourceAttributes, SourceKind};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::states::State;
use crate::tools::Toolchain;
use geojson::{Feature, FeatureCollection};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub decade_suffix: String,
    pub scores: Scores,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub converted: usize,
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// Reads a JSON object mapping `ccid` to a numeric score.
pub fn load_scores(path: &Path) -> Result<Scores> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let raw: BTreeMap<String, Value> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::json(path, e))?;
    Ok(raw
        .into_iter()
        .filter_map(|(ccid, v)| match v {
            Value::Number(n) => Some((ccid, n)),
            _ => {
                warn!(ccid = %ccid, "ignoring non-numeric score");
                None
            }
        })
        .collect())
}

/// How features in `path` are read, given the source family it matched.
pub fn source_kind(spec: &SourceSpec, path: &Path) -> SourceKind {
    if spec.whole_state {
        return SourceKind::WholeState;
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let chamber = Chamber::from_stem(stem);
    match &spec.state_fips {
        Some(state_fips) => SourceKind::NumberedDistricts {
            chamber,
            state_fips: state_fips.clone(),
        },
        None => SourceKind::Chamber(chamber),
    }
}

/// Replaces every feature's properties and groups the features by state.
pub fn normalize_collection(
    fc: FeatureCollection,
    kind: &SourceKind,
    options: &NormalizeOptions,
) -> Result<Vec<(&'static State, FeatureCollection)>> {
    let mut groups: BTreeMap<&'static str, (&'static State, Vec<Feature>)> = BTreeMap::new();

    for (index, feature) in fc.features.into_iter().enumerate() {
        let attrs = SourceAttributes::from_properties(
            feature.properties.as_ref(),
            kind,
            &options.decade_suffix,
            index,
        )?;
        let state = district::resolve_state(kind, &attrs, index)?;
        let properties = district::derive(kind, &attrs, &options.scores, index)?;

        let normalized = Feature {
            bbox: feature.bbox,
            geometry: feature.geometry,
            id: feature.id,
            properties: Some(properties.into_object()),
            foreign_members: None,
        };
        groups
            .entry(state.fips)
            .or_insert_with(|| (state, Vec::new()))
            .1
            .push(normalized);
    }

    Ok(groups
        .into_values()
        .map(|(state, features)| {
            (
                state,
                FeatureCollection {
                    bbox: None,
                    features,
                    foreign_members: None,
                },
            )
        })
        .collect())
}

/// Normalizes one converted file into `out_dir`, returning the files
/// written. Outputs the manifest already holds are left untouched.
pub fn normalize_file(
    input: &Path,
    kind: &SourceKind,
    out_dir: &Path,
    options: &NormalizeOptions,
    manifest: &mut Manifest,
) -> Result<Vec<PathBuf>> {
    let fc = read_collection(input)?;
    if fc.features.is_empty() {
        return Err(Error::EmptyCollection {
            path: input.to_path_buf(),
        });
    }

    let region = kind.region();
    let mut written = Vec::new();
    for (state, collection) in normalize_collection(fc, kind, options)? {
        let output = out_dir.join(region.file_name(state));
        if manifest.is_complete(input, &output)? {
            info!(output = %output.display(), "already exists, skipping");
            continue;
        }
        info!(
            state = state.abbr,
            region = %region,
            features = collection.features.len(),
            "{} => {}",
            input.display(),
            output.display()
        );
        write_collection(&output, &collection)?;
        manifest.record(input, &output)?;
        written.push(output);
    }
    Ok(written)
}

/// Converts every configured shapefile under `fetch/` and normalizes it
/// into `process/`.
pub fn run_normalize<T: Toolchain>(
    config: &PipelineConfig,
    tools: &T,
    manifest: &mut Manifest,
) -> Result<NormalizeReport> {
    let layout = config.layout();
    let boundary = config.boundary_path();
    let options = NormalizeOptions {
        decade_suffix: config.decade_suffix.clone(),
        scores: match config.scores_path() {
            Some(path) => load_scores(&path)?,
            None => Scores::new(),
        },
    };

    let mut report = NormalizeReport::default();
    for spec in &config.sources {
        for shapefile in list_files(&layout.fetch(), &spec.pattern)? {
            if shapefile == boundary {
                continue;
            }
            let kind = source_kind(spec, &shapefile);
            if !config.regions.contains(&kind.region()) {
                continue;
            }

            let converted = shapefile.with_extension("geojson");
            if converted.exists() {
                info!(path = %converted.display(), "already exists, skipping");
            } else if config.stages.convert {
                info!("{} => {}", shapefile.display(), converted.display());
                tools.convert(
                    &shapefile,
                    &converted,
                    &config.source_crs,
                    spec.filter.as_deref(),
                )?;
                report.converted += 1;
            } else {
                warn!(path = %shapefile.display(), "not converted and conversion disabled");
                report.skipped += 1;
                continue;
            }

            if config.stages.normalize {
                let written =
                    normalize_file(&converted, &kind, &layout.process(), &options, manifest)?;
                if written.is_empty() {
                    report.skipped += 1;
                }
                report.written.extend(written);
            }
        }
    }
    info!(
        converted = report.converted,
        written = report.written.len(),
        "done converting shp to geojson"
    );
    Ok(report)
}
