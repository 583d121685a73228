use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("{path} is not a FeatureCollection")]
    NotFeatureCollection { path: PathBuf },

    #[error("{path} contains no features")]
    EmptyCollection { path: PathBuf },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("feature {feature} is missing attribute {key}")]
    MissingAttribute { feature: usize, key: &'static str },

    #[error("feature {feature} has malformed attribute {key}: {reason}")]
    InvalidAttribute {
        feature: usize,
        key: &'static str,
        reason: String,
    },

    #[error("unknown state FIPS code: {0}")]
    UnknownFips(String),

    #[error("failed to start {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ToolFailed { program: String, status: String },

    #[error("geometry in {path} is still invalid after repair")]
    StillInvalid { path: PathBuf },

    #[error("bad glob pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("glob traversal failed: {0}")]
    Glob(#[from] glob::GlobError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
