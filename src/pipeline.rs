//! Clip, depoint and reproject normalized district files.
//!
//! Per input file the stages run in a fixed order:
//!
//! ```text
//! process/XX-house.geojson
//!   -> clipped/house/XX-house.geojson     (clip to national boundary)
//!   -> depointed/house/XX-house.geojson   (strip point parts)
//!   -> clean/house/XX-house.geojson       (forward projection, repair)
//! ```
//!
//! Every stage is skipped when the manifest says its output is current,
//! and a file whose clean output is current is skipped outright, so a
//! repeated run invokes no external tool at all.

use crate::collection::list_files;
use crate::config::{Layout, PipelineConfig};
use crate::depoint::{depoint_resumable, DepointOutcome};
use crate::district::Region;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::normalize::{run_normalize, NormalizeReport};
use crate::tools::Toolchain;
use crate::validate::is_valid_file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub clipped: usize,
    pub depointed: usize,
    pub reprojected: usize,
    pub repaired: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub normalize: Option<NormalizeReport>,
    pub clean: CleanReport,
}

pub struct Pipeline<'a, T: Toolchain> {
    config: &'a PipelineConfig,
    tools: &'a T,
    layout: Layout,
    manifest: Manifest,
}

impl<'a, T: Toolchain> Pipeline<'a, T> {
    pub fn new(config: &'a PipelineConfig, tools: &'a T) -> Result<Self> {
        let layout = config.layout();
        let manifest = Manifest::open(layout.manifest(), config.resume)?;
        Ok(Pipeline {
            config,
            tools,
            layout,
            manifest,
        })
    }

    /// `fetch/` shapefiles to `process/` GeoJSON.
    pub fn normalize(&mut self) -> Result<NormalizeReport> {
        run_normalize(self.config, self.tools, &mut self.manifest)
    }

    /// Depoints every `clipped/<region>` file into `depointed/<region>`.
    pub fn depoint_region(&mut self, region: Region) -> Result<usize> {
        let src_dir = self.layout.clipped().join(region.as_str());
        let dst_dir = self.layout.depointed().join(region.as_str());
        let mut cleaned = 0;
        for src in list_files(&src_dir, &region.pattern())? {
            let dst = dst_dir.join(file_name(&src));
            if let DepointOutcome::Cleaned(_) = depoint_resumable(&src, &dst, &mut self.manifest)? {
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }

    /// Clips, depoints and reprojects every configured region.
    pub fn clean(&mut self) -> Result<CleanReport> {
        info!("clip geojson to shoreline and reproject");
        let config = self.config;
        self.layout.create_dirs(&config.regions)?;

        let mut report = CleanReport::default();
        for &region in &config.regions {
            self.clean_region(region, &mut report)?;
            self.remove_intermediates(region)?;
        }
        info!(?report, "done reprojecting, results are in {}", self.layout.clean().display());
        Ok(report)
    }

    /// Normalization stages (if enabled) followed by [`Pipeline::clean`].
    pub fn run(&mut self) -> Result<RunReport> {
        let normalize = if self.config.stages.convert || self.config.stages.normalize {
            Some(self.normalize()?)
        } else {
            None
        };
        let clean = self.clean()?;
        Ok(RunReport { normalize, clean })
    }

    fn clean_region(&mut self, region: Region, report: &mut CleanReport) -> Result<()> {
        let config = self.config;
        let stages = &config.stages;
        let clipped_dir = self.layout.clipped().join(region.as_str());
        let depointed_dir = self.layout.depointed().join(region.as_str());
        let clean_dir = self.layout.clean().join(region.as_str());

        for source in list_files(&self.layout.process(), &region.pattern())? {
            let name = file_name(&source);
            let clean = clean_dir.join(&name);

            if self.manifest.is_complete(&source, &clean)? {
                info!(path = %clean.display(), "exists, skipping");
                report.skipped += 1;
                continue;
            }

            let mut current = source.clone();

            if stages.clip {
                let clipped = clipped_dir.join(&name);
                if self.manifest.is_complete(&current, &clipped)? {
                    info!(path = %clipped.display(), "exists, skipping");
                } else {
                    info!("{} => {}", current.display(), clipped.display());
                    remove_stale(&clipped)?;
                    self.tools
                        .clip(&config.boundary_path(), &current, &clipped)?;
                    self.manifest.record(&current, &clipped)?;
                    report.clipped += 1;
                }
                current = clipped;
            }

            if stages.depoint {
                let depointed = depointed_dir.join(&name);
                if let DepointOutcome::Cleaned(_) =
                    depoint_resumable(&current, &depointed, &mut self.manifest)?
                {
                    report.depointed += 1;
                }
                current = depointed;
            }

            if stages.reproject {
                info!("{} => {}", current.display(), clean.display());
                if self.reproject(&current, &clean)? {
                    report.repaired += 1;
                }
                self.manifest.record(&source, &clean)?;
                report.reprojected += 1;
            }
        }
        Ok(())
    }

    /// Projects `src` into `dst`, then re-exports `dst` through the repair
    /// tool if the projection produced invalid geometry. Returns whether a
    /// repair happened.
    fn reproject(&self, src: &Path, dst: &Path) -> Result<bool> {
        self.tools.reproject(src, dst, &self.config.projection)?;

        if !self.config.stages.repair || is_valid_file(dst)? {
            return Ok(false);
        }

        warn!(path = %dst.display(), "invalid geometry after reprojection, repairing");
        let aside = temp_name(dst);
        fs::rename(dst, &aside).map_err(|e| Error::io(dst, e))?;
        self.tools.repair(&aside, dst)?;
        fs::remove_file(&aside).map_err(|e| Error::io(&aside, e))?;

        if self.config.strict_repair && !is_valid_file(dst)? {
            return Err(Error::StillInvalid {
                path: dst.to_path_buf(),
            });
        }
        Ok(true)
    }

    fn remove_intermediates(&self, region: Region) -> Result<()> {
        let mut doomed = Vec::new();
        if !self.config.keep_clipped {
            doomed.push(self.layout.clipped().join(region.as_str()));
        }
        if !self.config.keep_depointed {
            doomed.push(self.layout.depointed().join(region.as_str()));
        }
        for dir in doomed {
            if dir.exists() {
                info!(path = %dir.display(), "removing intermediate files");
                fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            }
        }
        Ok(())
    }
}

/// Clears a leftover output; the clip tool refuses to write over one.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn file_name(path: &Path) -> PathBuf {
    path.file_name().map(PathBuf::from).unwrap_or_default()
}

/// `XX-house.geojson` -> `XX-house-temp.geojson`
fn temp_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-temp.{}", stem, ext.to_string_lossy()),
        None => format!("{}-temp", stem),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_name_keeps_extension() {
        assert_eq!(
            temp_name(Path::new("clean/house/NJ-house.geojson")),
            PathBuf::from("clean/house/NJ-house-temp.geojson")
        );
    }
}
