//! Error kinds of the attribution engine.
//!
//! Apart from [`ConfigError`] every kind here is recovered where it is raised;
//! the query path never fails.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("offsetting a ring of {vertices} vertices by {distance} left no usable polygon")]
    DegenerateRingOffset { distance: f64, vertices: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("gazetteer has no cities for country {country_code}")]
    EmptyGazetteerForCountry { country_code: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("track has {len} entries, more than {min} are needed for disambiguation")]
    InsufficientTrackLength { len: usize, min: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config field `{field}` must be {expected}, got {value}")]
    Invalid {
        field: String,
        expected: &'static str,
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        expected: &'static str,
        value: impl ToString,
    ) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }
}
