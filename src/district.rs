//! Typed district records: the attributes read from converted Census
//! shapefiles and the property set written for every output feature.

use crate::error::{Error, Result};
use crate::states::{self, State};
use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder `cc_score` for whole-state records with no score data.
pub const WHOLE_STATE_SCORE: u64 = 999;

/// Scores keyed by `ccid`.
pub type Scores = HashMap<String, Number>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    House,
    Senate,
    State,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::House, Region::Senate, Region::State];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::House => "house",
            Region::Senate => "senate",
            Region::State => "state",
        }
    }

    /// Glob matching this region's files inside a flat directory.
    pub fn pattern(self) -> String {
        format!("*{}.geojson", self.as_str())
    }

    pub fn file_name(self, state: &State) -> String {
        format!("{}-{}.geojson", state.abbr, self.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "house" => Ok(Region::House),
            "senate" => Ok(Region::Senate),
            "state" => Ok(Region::State),
            other => Err(format!("unknown region '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    /// Census lower-chamber files end in `sldl`; everything else is upper.
    pub fn from_stem(stem: &str) -> Chamber {
        if stem.to_ascii_lowercase().ends_with("sldl") {
            Chamber::House
        } else {
            Chamber::Senate
        }
    }

    pub fn region(self) -> Region {
        match self {
            Chamber::House => Region::House,
            Chamber::Senate => Region::Senate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Chamber::House => "House",
            Chamber::Senate => "Senate",
        }
    }
}

/// How a converted source file's attributes are to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Census TIGER chamber districts (`STATEFP`, `GEOID`, `LSAD`, ...).
    Chamber(Chamber),
    /// District-numbered single-state file (`DISTRICT`, `TOTAL`) whose
    /// state is known up front.
    NumberedDistricts { chamber: Chamber, state_fips: String },
    /// Whole-state boundaries.
    WholeState,
}

impl SourceKind {
    pub fn region(&self) -> Region {
        match self {
            SourceKind::Chamber(chamber) | SourceKind::NumberedDistricts { chamber, .. } => {
                chamber.region()
            }
            SourceKind::WholeState => Region::State,
        }
    }
}

/// A raw attribute value. Shapefile conversion yields strings for most
/// codes but integers or floats for numeric columns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) if v.fract() == 0.0 => write!(f, "{}", *v as i64),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(v) => f.write_str(v.trim()),
        }
    }
}

/// The source attributes the normalizer knows about. Anything else in the
/// feature's property set is dropped.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceAttributes {
    #[serde(rename = "STATEFP")]
    pub statefp: Option<AttrValue>,
    #[serde(rename = "GEOID")]
    pub geoid: Option<AttrValue>,
    #[serde(rename = "LSAD")]
    pub lsad: Option<AttrValue>,
    #[serde(rename = "NAMELSAD")]
    pub namelsad: Option<AttrValue>,
    #[serde(rename = "SLDLST")]
    pub sldlst: Option<AttrValue>,
    #[serde(rename = "SLDUST")]
    pub sldust: Option<AttrValue>,
    #[serde(rename = "DISTRICT")]
    pub district: Option<AttrValue>,
    #[serde(rename = "TOTAL")]
    pub total: Option<AttrValue>,
}

impl SourceAttributes {
    /// Reads a feature's property set. Whole-state sources first have the
    /// decade suffix stripped from their keys (`STATEFP20` -> `STATEFP`).
    pub fn from_properties(
        properties: Option<&JsonObject>,
        kind: &SourceKind,
        decade_suffix: &str,
        feature: usize,
    ) -> Result<Self> {
        let mut properties = properties.cloned().unwrap_or_default();
        if *kind == SourceKind::WholeState {
            properties = strip_decade_suffix(properties, decade_suffix);
        }
        serde_json::from_value(Value::Object(properties)).map_err(|e| Error::InvalidAttribute {
            feature,
            key: "properties",
            reason: e.to_string(),
        })
    }
}

/// Renames every key ending in `suffix` to the key without it.
pub fn strip_decade_suffix(properties: JsonObject, suffix: &str) -> JsonObject {
    if suffix.is_empty() {
        return properties;
    }
    properties
        .into_iter()
        .map(|(key, value)| match key.strip_suffix(suffix) {
            Some(stripped) if !stripped.is_empty() => (stripped.to_string(), value),
            _ => (key, value),
        })
        .collect()
}

/// The complete property set of an output feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictProperties {
    pub state_fips: String,
    pub state_abbr: String,
    pub geoid: String,
    pub ccid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chamber: Option<Chamber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_score: Option<Number>,
}

impl DistrictProperties {
    pub fn into_object(self) -> JsonObject {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonObject::new(),
        }
    }
}

fn required<'a>(
    value: &'a Option<AttrValue>,
    key: &'static str,
    feature: usize,
) -> Result<&'a AttrValue> {
    value
        .as_ref()
        .ok_or(Error::MissingAttribute { feature, key })
}

fn strip_leading_zeros(code: &str) -> String {
    let stripped = code.trim().trim_start_matches('0');
    if stripped.is_empty() && !code.trim().is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

fn to_number(value: &AttrValue, key: &'static str, feature: usize) -> Result<Number> {
    let invalid = |reason: String| Error::InvalidAttribute {
        feature,
        key,
        reason,
    };
    match value {
        AttrValue::Int(v) => Ok(Number::from(*v)),
        AttrValue::Float(v) => {
            Number::from_f64(*v).ok_or_else(|| invalid(format!("{} is not finite", v)))
        }
        AttrValue::Text(v) => v
            .trim()
            .parse::<i64>()
            .map(Number::from)
            .map_err(|e| invalid(format!("'{}': {}", v, e))),
    }
}

/// `U` for upper-chamber records, or any record whose LSAD is the upper
/// chamber code `LU`; `L` otherwise.
pub fn ccid_suffix(chamber: Chamber, lsad: Option<&str>) -> char {
    if chamber == Chamber::Senate || lsad == Some("LU") {
        'U'
    } else {
        'L'
    }
}

/// Derives the output property set for one feature.
pub fn derive(
    kind: &SourceKind,
    attrs: &SourceAttributes,
    scores: &Scores,
    feature: usize,
) -> Result<DistrictProperties> {
    match kind {
        SourceKind::WholeState => derive_whole_state(attrs, scores, feature),
        SourceKind::Chamber(chamber) => derive_chamber(*chamber, attrs, scores, feature),
        SourceKind::NumberedDistricts {
            chamber,
            state_fips,
        } => derive_numbered(*chamber, state_fips, attrs, scores, feature),
    }
}

/// Resolves the state a feature belongs to without deriving anything else.
pub fn resolve_state(
    kind: &SourceKind,
    attrs: &SourceAttributes,
    feature: usize,
) -> Result<&'static State> {
    match kind {
        SourceKind::NumberedDistricts { state_fips, .. } => states::by_fips(state_fips),
        _ => states::by_fips(&required(&attrs.statefp, "STATEFP", feature)?.to_string()),
    }
}

/// `GEOID` codes are the state FIPS code followed by the local code.
fn check_geoid(geoid: &str, state: &State, feature: usize) -> Result<()> {
    if geoid.starts_with(state.fips) {
        Ok(())
    } else {
        Err(Error::InvalidAttribute {
            feature,
            key: "GEOID",
            reason: format!("'{}' does not start with state FIPS {}", geoid, state.fips),
        })
    }
}

fn derive_whole_state(
    attrs: &SourceAttributes,
    scores: &Scores,
    feature: usize,
) -> Result<DistrictProperties> {
    let state = resolve_state(&SourceKind::WholeState, attrs, feature)?;
    let geoid = attrs
        .geoid
        .as_ref()
        .map(|g| g.to_string())
        .unwrap_or_else(|| state.fips.to_string());
    check_geoid(&geoid, state, feature)?;
    let ccid = state.fips.to_string();
    let cc_score = scores
        .get(&ccid)
        .cloned()
        .unwrap_or_else(|| Number::from(WHOLE_STATE_SCORE));

    Ok(DistrictProperties {
        state_fips: state.fips.to_string(),
        state_abbr: state.abbr.to_string(),
        geoid,
        ccid,
        name: state.name.to_string(),
        chamber: None,
        district: None,
        population: None,
        cc_score: Some(cc_score),
    })
}

fn derive_chamber(
    chamber: Chamber,
    attrs: &SourceAttributes,
    scores: &Scores,
    feature: usize,
) -> Result<DistrictProperties> {
    let state = resolve_state(&SourceKind::Chamber(chamber), attrs, feature)?;
    let geoid = required(&attrs.geoid, "GEOID", feature)?.to_string();
    check_geoid(&geoid, state, feature)?;

    let district = match (&attrs.sldlst, &attrs.sldust) {
        (Some(lower), _) => strip_leading_zeros(&lower.to_string()),
        (None, Some(upper)) => strip_leading_zeros(&upper.to_string()),
        (None, None) => match &geoid[state.fips.len()..] {
            "" => {
                return Err(Error::InvalidAttribute {
                    feature,
                    key: "GEOID",
                    reason: format!("'{}' has no district code after the state FIPS", geoid),
                })
            }
            rest => strip_leading_zeros(rest),
        },
    };

    let lsad = attrs.lsad.as_ref().map(|l| l.to_string());
    let ccid = format!("{}{}", geoid, ccid_suffix(chamber, lsad.as_deref()));

    let name = match &attrs.namelsad {
        Some(label) => format!("{} {}", state.name, label),
        None => format!("{} State {} {}", state.name, chamber.as_str(), district),
    };

    let population = attrs
        .total
        .as_ref()
        .map(|t| to_number(t, "TOTAL", feature))
        .transpose()?;
    let cc_score = scores.get(&ccid).cloned();

    Ok(DistrictProperties {
        state_fips: state.fips.to_string(),
        state_abbr: state.abbr.to_string(),
        geoid,
        ccid,
        name,
        chamber: Some(chamber),
        district: Some(district),
        population,
        cc_score,
    })
}

fn derive_numbered(
    chamber: Chamber,
    state_fips: &str,
    attrs: &SourceAttributes,
    scores: &Scores,
    feature: usize,
) -> Result<DistrictProperties> {
    let state = states::by_fips(state_fips)?;
    let raw = required(&attrs.district, "DISTRICT", feature)?.to_string();
    let district = strip_leading_zeros(&raw);
    let geoid = format!("{}{:0>3}", state.fips, district);
    let ccid = format!("{}{}", geoid, ccid_suffix(chamber, None));
    let name = format!("{} State {} {}", state.name, chamber.as_str(), district);
    let population = attrs
        .total
        .as_ref()
        .map(|t| to_number(t, "TOTAL", feature))
        .transpose()?;
    let cc_score = scores.get(&ccid).cloned();

    Ok(DistrictProperties {
        state_fips: state.fips.to_string(),
        state_abbr: state.abbr.to_string(),
        geoid,
        ccid,
        name,
        chamber: Some(chamber),
        district: Some(district),
        population,
        cc_score,
    })
}
