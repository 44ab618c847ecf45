//! Client-address country lookup.
//!
//! The store treats country codes as opaque strings, so the lookup is a
//! collaborator behind [`CountryLookup`]: the shipped implementation matches
//! configured address prefixes, and anything smarter (a GeoIP database, an
//! upstream header) can slot in behind the same trait.

use std::net::IpAddr;

use crate::config::GeoConfig;

/// Code used when no rule matches an address ("ZZ" is reserved for
/// user-assigned/unknown use and never collides with a real country).
pub const UNKNOWN_COUNTRY: &str = "ZZ";

/// Maps a client network address to a 2-letter country code.
pub trait CountryLookup: Send + Sync {
    /// Country code for `addr`; returns an opaque placeholder when the
    /// address cannot be resolved.
    fn country_for(&self, addr: IpAddr) -> String;
}

/// Prefix-rule lookup backed by configuration.
///
/// Matches the textual form of the address against configured prefixes in
/// order; first match wins.
pub struct PrefixLookup {
    rules: Vec<(String, String)>,
    default: String,
}

impl PrefixLookup {
    pub fn new(rules: Vec<(String, String)>, default: impl Into<String>) -> Self {
        Self {
            rules,
            default: default.into(),
        }
    }

    pub fn from_config(config: &GeoConfig) -> Self {
        Self::new(
            config
                .rules
                .iter()
                .map(|r| (r.prefix.clone(), r.country.clone()))
                .collect(),
            config.default_country.clone(),
        )
    }
}

impl CountryLookup for PrefixLookup {
    fn country_for(&self, addr: IpAddr) -> String {
        let text = addr.to_string();
        self.rules
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix))
            .map(|(_, country)| country.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}
