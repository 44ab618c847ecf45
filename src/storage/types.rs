//! Core data types for the storage layer.
//!
//! Parsing is the only way to construct these types, so anything that
//! reaches a storage call has already passed lexical validation:
//!
//! - [`ClientId`]: client identifier in canonical 8-4-4-4-12 hex form
//! - [`Day`]: GMT calendar day in `YYYY-MM-DD` form
//! - [`CountryFilter`]: two-uppercase-letter query filter
//! - [`Sighting`]: one observed client on one day

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::storage::error::FormatError;

fn client_id_regex() -> &'static Regex {
    static CLIENT_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    CLIENT_ID_REGEX.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .expect("failed to compile client id regex")
    })
}

fn day_regex() -> &'static Regex {
    static DAY_REGEX: OnceLock<Regex> = OnceLock::new();
    DAY_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("failed to compile day regex")
    })
}

fn country_regex() -> &'static Regex {
    static COUNTRY_REGEX: OnceLock<Regex> = OnceLock::new();
    COUNTRY_REGEX
        .get_or_init(|| Regex::new(r"^[A-Z]{2}$").expect("failed to compile country regex"))
}

/// Client identifier in canonical hexadecimal 8-4-4-4-12 form.
///
/// Only the hyphenated form is accepted; the condensed 32-hex-digit form is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Parse a client id, rejecting anything outside the canonical form.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        if client_id_regex().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(FormatError::ClientId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// GMT calendar day in `YYYY-MM-DD` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day(String);

impl Day {
    /// Parse a day string, rejecting anything outside `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        if day_regex().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(FormatError::Day)
        }
    }

    /// The current calendar day in GMT.
    pub fn today_utc() -> Self {
        Self(chrono::Utc::now().format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Schema identifier for this day's presence column.
    ///
    /// Derived only from a validated day string, so the identifier is
    /// constrained to `day_` plus digits and underscores.
    pub fn column_name(&self) -> String {
        format!("day_{}", self.0.replace('-', "_"))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Country filter for presence queries: exactly two uppercase ASCII letters.
///
/// Stored country codes are opaque strings from the address lookup; only the
/// query-side filter is validated this strictly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryFilter(String);

impl CountryFilter {
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        if country_regex().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(FormatError::CountryFilter)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One observed client on one day.
#[derive(Debug, Clone)]
pub struct Sighting {
    /// Who was seen.
    pub id: ClientId,
    /// Country derived from the client's network address; stored as-is and
    /// only kept for the first sighting of an id.
    pub country: String,
    /// Which GMT day they were seen on.
    pub day: Day,
}

impl Sighting {
    pub fn new(id: ClientId, country: impl Into<String>, day: Day) -> Self {
        Self {
            id,
            country: country.into(),
            day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_canonical_form() {
        let id = ClientId::parse("123e4567-e89b-12d3-a456-426614174000").unwrap();
        assert_eq!(id.as_str(), "123e4567-e89b-12d3-a456-426614174000");
    }

    #[test]
    fn test_client_id_mixed_case() {
        assert!(ClientId::parse("123E4567-E89B-12d3-A456-426614174000").is_ok());
    }

    #[test]
    fn test_client_id_rejects_missing_hyphens() {
        let result = ClientId::parse("123e4567e89b12d3a456426614174000");
        assert_eq!(result.unwrap_err(), FormatError::ClientId);
    }

    #[test]
    fn test_client_id_rejects_bad_groups() {
        assert!(ClientId::parse("123e4567-e89b-12d3-a456-42661417400").is_err());
        assert!(ClientId::parse("123e4567-e89b-12d3-a456-4266141740000").is_err());
        assert!(ClientId::parse("g23e4567-e89b-12d3-a456-426614174000").is_err());
        assert!(ClientId::parse("").is_err());
    }

    #[test]
    fn test_day_valid() {
        let day = Day::parse("2020-10-25").unwrap();
        assert_eq!(day.as_str(), "2020-10-25");
    }

    #[test]
    fn test_day_rejects_other_orderings() {
        assert_eq!(Day::parse("10-25-2020").unwrap_err(), FormatError::Day);
        assert!(Day::parse("2020/10/25").is_err());
        assert!(Day::parse("2020-10-25T00:00:00").is_err());
        assert!(Day::parse("").is_err());
    }

    #[test]
    fn test_day_column_name() {
        let day = Day::parse("2020-10-25").unwrap();
        assert_eq!(day.column_name(), "day_2020_10_25");
    }

    #[test]
    fn test_day_today_utc_parses_back() {
        let today = Day::today_utc();
        assert!(Day::parse(today.as_str()).is_ok());
    }

    #[test]
    fn test_country_filter_valid() {
        let cc = CountryFilter::parse("US").unwrap();
        assert_eq!(cc.as_str(), "US");
    }

    #[test]
    fn test_country_filter_rejects_length_and_case() {
        assert_eq!(
            CountryFilter::parse("USA").unwrap_err(),
            FormatError::CountryFilter
        );
        assert!(CountryFilter::parse("us").is_err());
        assert!(CountryFilter::parse("U").is_err());
        assert!(CountryFilter::parse("U1").is_err());
    }
}
