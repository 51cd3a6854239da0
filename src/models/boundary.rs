//! Boundary features and the shifted points derived from them.

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Globally unique identifier of one disjoint boundary ring.
pub type FeatureId = u32;

/// Raw input: every ring of one country, as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRings {
    /// ISO 3166-1 alpha-2 code
    pub country_code: String,

    /// Continent or other grouping, only used to split the build into batches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub rings: Vec<Vec<Coordinate>>,
}

impl CountryRings {
    pub fn new(country_code: impl Into<String>, rings: Vec<Vec<Coordinate>>) -> Self {
        Self {
            country_code: country_code.into(),
            group: None,
            rings,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Whether a ring bounds territory of its country or cuts territory out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingRole {
    Outer,
    /// Enclave hole, stored as a separate ring labelled with the surrounding country
    Hole,
}

/// One disjoint ring of a country's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub feature_id: FeatureId,
    pub country_code: String,
    pub role: RingRole,
    /// Original, un-shifted ring
    pub ring: Vec<Coordinate>,
}

/// A vertex of a shifted (shrunk) boundary ring, the unit stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftedBoundaryPoint {
    pub coordinate: Coordinate,
    pub country_code: String,
    pub feature_id: FeatureId,

    /// The raw vertex it came from is shared with another feature
    #[serde(default)]
    pub border_adjacent: bool,
}
