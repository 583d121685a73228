//! External geospatial tools, run as blocking subprocesses.

use crate::config::ToolPrograms;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// The external collaborators the pipeline shells out to. Every call
/// blocks until the tool exits; a non-zero exit is an error.
pub trait Toolchain {
    /// Shapefile to GeoJSON in the `crs` coordinate reference, optionally
    /// keeping only features matching `filter`.
    fn convert(&self, src: &Path, dst: &Path, crs: &str, filter: Option<&str>) -> Result<()>;

    /// Clips `src` to the `boundary` shape.
    fn clip(&self, boundary: &Path, src: &Path, dst: &Path) -> Result<()>;

    /// Forward-projects `src` into `projection`.
    fn reproject(&self, src: &Path, dst: &Path, projection: &str) -> Result<()>;

    /// Re-exports `src` as a topologically repaired `dst`.
    fn repair(&self, src: &Path, dst: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemToolchain {
    programs: ToolPrograms,
}

impl SystemToolchain {
    pub fn new(programs: ToolPrograms) -> Self {
        SystemToolchain { programs }
    }
}

fn run(program: &str, mut command: Command) -> Result<()> {
    info!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), "running");
    let status = command.status().map_err(|source| Error::ToolSpawn {
        program: program.to_string(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::ToolFailed {
            program: program.to_string(),
            status: status.to_string(),
        })
    }
}

impl Toolchain for SystemToolchain {
    fn convert(&self, src: &Path, dst: &Path, crs: &str, filter: Option<&str>) -> Result<()> {
        let program = &self.programs.ogr2ogr;
        let mut command = Command::new(program);
        command.args(["-t_srs", crs, "-f", "GeoJSON"]);
        if let Some(filter) = filter {
            command.arg("-where").arg(filter);
        }
        command.arg(dst).arg(src);
        run(program, command)
    }

    fn clip(&self, boundary: &Path, src: &Path, dst: &Path) -> Result<()> {
        let program = &self.programs.ogr2ogr;
        let mut command = Command::new(program);
        command.arg("-clipsrc").arg(boundary).arg(dst).arg(src);
        run(program, command)
    }

    fn reproject(&self, src: &Path, dst: &Path, projection: &str) -> Result<()> {
        let program = &self.programs.reproject;
        let input = File::open(src).map_err(|e| Error::io(src, e))?;
        let output = File::create(dst).map_err(|e| Error::io(dst, e))?;

        let mut command = Command::new(program);
        command
            .args(["--forward", projection])
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output));

        let result = run(program, command);
        if result.is_err() {
            // a truncated projection must not look like finished output
            if let Err(e) = fs::remove_file(dst) {
                warn!(path = %dst.display(), error = %e, "could not remove partial output");
            }
        }
        result
    }

    fn repair(&self, src: &Path, dst: &Path) -> Result<()> {
        let program = &self.programs.mapshaper;
        let mut command = Command::new(program);
        command.arg(src).arg("-o").arg(dst);
        run(program, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tools = SystemToolchain::new(ToolPrograms {
            ogr2ogr: "definitely-not-installed-ogr2ogr".into(),
            ..ToolPrograms::default()
        });
        let dir = TempDir::new().unwrap();
        let err = tools
            .clip(
                &dir.path().join("nation.shp"),
                &dir.path().join("a.geojson"),
                &dir.path().join("b.geojson"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ToolSpawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failed_reprojection_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.geojson");
        let dst = dir.path().join("out.geojson");
        fs::write(&src, "{}").unwrap();
        let tools = SystemToolchain::new(ToolPrograms {
            reproject: "false".into(),
            ..ToolPrograms::default()
        });
        let err = tools.reproject(&src, &dst, "albersUsa").unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
        assert!(!dst.exists());
    }
}
