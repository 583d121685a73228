//! Record of finished (input, output) pairs, keyed by output path.
//!
//! An entry counts as complete only while both files still hash to the
//! recorded digests, so editing an input or clobbering an output makes the
//! step run again.

use crate::config::ResumePolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub input: PathBuf,
    pub input_sha256: String,
    pub output_sha256: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Records {
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    policy: ResumePolicy,
    records: Records,
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| Error::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Manifest {
    /// Opens the manifest at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>, policy: ResumePolicy) -> Result<Self> {
        let path = path.into();
        let records = match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::json(&path, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Records::default(),
            Err(e) => return Err(Error::io(&path, e)),
        };
        Ok(Manifest {
            path,
            policy,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.entries.is_empty()
    }

    /// Whether producing `output` from `input` can be skipped.
    pub fn is_complete(&self, input: &Path, output: &Path) -> Result<bool> {
        if !output.exists() {
            return Ok(false);
        }
        match self.policy {
            ResumePolicy::Exists => Ok(true),
            ResumePolicy::Manifest => {
                let Some(entry) = self.records.entries.get(&key(output)) else {
                    return Ok(false);
                };
                if entry.input != input || !input.exists() {
                    return Ok(false);
                }
                Ok(entry.input_sha256 == sha256_file(input)?
                    && entry.output_sha256 == sha256_file(output)?)
            }
        }
    }

    /// Records `output` as produced from `input` and persists the manifest.
    /// A no-op under the `exists` policy.
    pub fn record(&mut self, input: &Path, output: &Path) -> Result<()> {
        if self.policy == ResumePolicy::Exists {
            return Ok(());
        }
        let entry = Entry {
            input: input.to_path_buf(),
            input_sha256: sha256_file(input)?,
            output_sha256: sha256_file(output)?,
        };
        debug!(output = %output.display(), "recording in manifest");
        self.records.entries.insert(key(output), entry);
        self.save()
    }

    /// Writes to a sibling temp file and renames it over the manifest.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .map_err(|e| Error::json(&tmp, e))?;
        writer.flush().map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))
    }
}
