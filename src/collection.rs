use crate::error::{Error, Result};
use geojson::{FeatureCollection, GeoJson};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a GeoJSON file that must hold a FeatureCollection.
pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    debug!(path = %path.display(), "loading");
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let geojson =
        GeoJson::from_reader(BufReader::new(file)).map_err(|e| Error::json(path, e))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(Error::NotFeatureCollection {
            path: path.to_path_buf(),
        }),
    }
}

/// Writes `fc` to `path`, creating the parent directory if needed.
pub fn write_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, fc).map_err(|e| Error::json(path, e))?;
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Files in `dir` matching `pattern`, sorted by path.
pub fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full).map_err(|source| Error::Pattern {
        pattern: full.clone(),
        source,
    })?;
    let mut files = paths
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|p| p.is_file())
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}
