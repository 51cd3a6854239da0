//! Resolver output types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FeatureId;

/// Country attribution of a point: either one code, or a set of tied codes the
/// caller has to treat as genuinely ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryLabel {
    Resolved(String),
    /// Ordered, de-duplicated candidates. Empty when nothing could be looked up.
    Ambiguous(Vec<String>),
}

impl CountryLabel {
    /// Build a label from ordered candidate codes. Duplicates are dropped keeping
    /// first occurrence; a single remaining code is `Resolved`.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for code in codes {
            let code = code.into();
            if !unique.contains(&code) {
                unique.push(code);
            }
        }
        if unique.len() == 1 {
            CountryLabel::Resolved(unique.remove(0))
        } else {
            CountryLabel::Ambiguous(unique)
        }
    }

    pub fn resolved(code: impl Into<String>) -> Self {
        CountryLabel::Resolved(code.into())
    }

    /// Label with no candidates at all
    pub fn unknown() -> Self {
        CountryLabel::Ambiguous(Vec::new())
    }

    pub fn codes(&self) -> &[String] {
        match self {
            CountryLabel::Resolved(code) => std::slice::from_ref(code),
            CountryLabel::Ambiguous(codes) => codes,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.codes().first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.codes().last().map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes().iter().any(|c| c == code)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, CountryLabel::Ambiguous(_))
    }

    /// The single code, if resolved
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            CountryLabel::Resolved(code) => Some(code),
            CountryLabel::Ambiguous(_) => None,
        }
    }
}

impl fmt::Display for CountryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codes().join(","))
    }
}

/// Nearest settlement of a resolved point. Empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub admin_name: String,
    pub city: String,
}

/// Outcome of resolving one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub label: CountryLabel,

    /// Feature the point was attributed to, when one could be singled out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<FeatureId>,

    /// First-level administrative region of the nearest city
    pub admin_name: String,

    pub city: String,

    /// Planar distance (degrees) to the nearest shifted boundary point; `None`
    /// when there was nothing to measure against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_nearest_boundary: Option<f64>,
}

impl Resolution {
    pub fn new(label: CountryLabel, feature_id: Option<FeatureId>, distance: f64) -> Self {
        Self {
            label,
            feature_id,
            admin_name: String::new(),
            city: String::new(),
            distance_to_nearest_boundary: Some(distance),
        }
    }

    /// Nothing to look up against (empty index or invalid coordinate)
    pub fn unknown() -> Self {
        Self {
            distance_to_nearest_boundary: None,
            ..Self::new(CountryLabel::unknown(), None, 0.0)
        }
    }

    pub fn with_settlement(mut self, settlement: Settlement) -> Self {
        self.admin_name = settlement.admin_name;
        self.city = settlement.city;
        self
    }

    pub fn country_code(&self) -> Option<&str> {
        self.label.as_resolved()
    }
}

/// A query point together with its resolution, keyed like the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(flatten)]
    pub resolution: Resolution,
}
