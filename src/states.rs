//! Reference table of US states and territories keyed by FIPS code.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub name: &'static str,
    pub fips: &'static str,
    pub abbr: &'static str,
}

const fn st(name: &'static str, fips: &'static str, abbr: &'static str) -> State {
    State { name, fips, abbr }
}

pub const STATES: &[State] = &[
    st("Alabama", "01", "AL"),
    st("Alaska", "02", "AK"),
    st("Arizona", "04", "AZ"),
    st("Arkansas", "05", "AR"),
    st("California", "06", "CA"),
    st("Colorado", "08", "CO"),
    st("Connecticut", "09", "CT"),
    st("Delaware", "10", "DE"),
    st("District of Columbia", "11", "DC"),
    st("Florida", "12", "FL"),
    st("Georgia", "13", "GA"),
    st("Hawaii", "15", "HI"),
    st("Idaho", "16", "ID"),
    st("Illinois", "17", "IL"),
    st("Indiana", "18", "IN"),
    st("Iowa", "19", "IA"),
    st("Kansas", "20", "KS"),
    st("Kentucky", "21", "KY"),
    st("Louisiana", "22", "LA"),
    st("Maine", "23", "ME"),
    st("Maryland", "24", "MD"),
    st("Massachusetts", "25", "MA"),
    st("Michigan", "26", "MI"),
    st("Minnesota", "27", "MN"),
    st("Mississippi", "28", "MS"),
    st("Missouri", "29", "MO"),
    st("Montana", "30", "MT"),
    st("Nebraska", "31", "NE"),
    st("Nevada", "32", "NV"),
    st("New Hampshire", "33", "NH"),
    st("New Jersey", "34", "NJ"),
    st("New Mexico", "35", "NM"),
    st("New York", "36", "NY"),
    st("North Carolina", "37", "NC"),
    st("North Dakota", "38", "ND"),
    st("Ohio", "39", "OH"),
    st("Oklahoma", "40", "OK"),
    st("Oregon", "41", "OR"),
    st("Pennsylvania", "42", "PA"),
    st("Rhode Island", "44", "RI"),
    st("South Carolina", "45", "SC"),
    st("South Dakota", "46", "SD"),
    st("Tennessee", "47", "TN"),
    st("Texas", "48", "TX"),
    st("Utah", "49", "UT"),
    st("Vermont", "50", "VT"),
    st("Virginia", "51", "VA"),
    st("Washington", "53", "WA"),
    st("West Virginia", "54", "WV"),
    st("Wisconsin", "55", "WI"),
    st("Wyoming", "56", "WY"),
    st("American Samoa", "60", "AS"),
    st("Guam", "66", "GU"),
    st("Northern Mariana Islands", "69", "MP"),
    st("Puerto Rico", "72", "PR"),
    st("Virgin Islands", "78", "VI"),
];

/// Looks up a state by its two-digit FIPS code. Single-digit codes are
/// accepted and zero-padded, since some sources store them as integers.
pub fn by_fips(fips: &str) -> Result<&'static State> {
    let fips = fips.trim();
    let padded = format!("{:0>2}", fips);
    STATES
        .iter()
        .find(|s| s.fips == padded)
        .ok_or_else(|| Error::UnknownFips(fips.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_florida() {
        let fl = by_fips("12").unwrap();
        assert_eq!(fl.name, "Florida");
        assert_eq!(fl.abbr, "FL");
    }

    #[test]
    fn pads_short_codes() {
        assert_eq!(by_fips("6").unwrap().abbr, "CA");
    }

    #[test]
    fn unknown_fips_is_an_error() {
        assert!(matches!(by_fips("03"), Err(Error::UnknownFips(code)) if code == "03"));
    }
}
