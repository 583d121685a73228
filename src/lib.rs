//! Normalizes US legislative district shapefiles into GeoJSON carrying a
//! fixed set of identifying properties, then clips, cleans and reprojects
//! them for mapping.

pub mod collection;
pub mod config;
pub mod depoint;
pub mod district;
pub mod error;
pub mod manifest;
pub mod normalize;
pub mod pipeline;
pub mod states;
pub mod tools;
pub mod validate;

pub use config::{Layout, PipelineConfig, ResumePolicy};
pub use district::{Chamber, DistrictProperties, Region, SourceKind};
pub use error::{Error, Result};
pub use pipeline::{CleanReport, Pipeline, RunReport};
pub use tools::{SystemToolchain, Toolchain};
