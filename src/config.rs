//! Engine configuration.
//!
//! Every calibration constant of the pipeline lives here, including the tables of
//! per-country exceptions (enclave offsets, sampling strides), so that they are data
//! rather than code. The struct is handed to [`crate::build_boundary_index`]; there is
//! no process-wide state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::pip::JoinStyle;

/// Smallest accepted `boundary.max_point_spacing` (degrees, about 10 cm)
pub const MIN_POINT_SPACING: f64 = 1e-6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub boundary: BoundaryConfig,
    pub index: IndexConfig,
    pub track: TrackConfig,
}

/// Which offset magnitude a country's rings are shrunk by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetClass {
    Standard,
    /// Fully enclosed by a single other country
    Enclave,
}

/// Winding of outer rings in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

impl Winding {
    /// Winding of a ring with the given signed area (positive = counter-clockwise).
    pub fn of_signed_area(area: f64) -> Self {
        if area < 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Inward offset (degrees) for ordinary countries
    pub standard_offset: f64,

    /// Inward offset (degrees) for enclaves, an order of magnitude above the standard one
    pub enclave_offset: f64,

    /// country_code -> offset class; absent codes are `standard`
    pub offset_classes: HashMap<String, OffsetClass>,

    pub join_style: JoinStyle,

    /// Rings with fewer distinct vertices are indexed un-shifted
    pub min_offset_vertices: usize,

    pub outer_winding: Winding,

    /// Raw vertices of different features at most this far apart (degrees) count as
    /// the same position when detecting shared borders
    pub coincidence_tolerance: f64,

    /// Keep every n-th non border-adjacent shifted point
    pub default_stride: usize,

    /// country_code -> stride
    pub stride_overrides: HashMap<String, usize>,

    /// Densify shifted rings so consecutive points are at most this far apart
    /// (degrees). Off by default; meant for coarse boundary sources.
    pub max_point_spacing: Option<f64>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        let offset_classes = ["LS", "SM", "VA"]
            .into_iter()
            .map(|cc| (cc.to_string(), OffsetClass::Enclave))
            .collect();

        Self {
            standard_offset: 1e-4,
            enclave_offset: 1e-3,
            offset_classes,
            join_style: JoinStyle::default(),
            min_offset_vertices: 4,
            outer_winding: Winding::Clockwise,
            coincidence_tolerance: 1e-7,
            default_stride: 1,
            stride_overrides: HashMap::new(),
            max_point_spacing: None,
        }
    }
}

impl BoundaryConfig {
    pub fn offset_class(&self, country_code: &str) -> OffsetClass {
        self.offset_classes
            .get(country_code)
            .copied()
            .unwrap_or(OffsetClass::Standard)
    }

    /// Magnitude (always positive) by which the country's territory is shrunk.
    pub fn offset_for(&self, country_code: &str) -> f64 {
        match self.offset_class(country_code) {
            OffsetClass::Standard => self.standard_offset.abs(),
            OffsetClass::Enclave => self.enclave_offset.abs(),
        }
    }

    pub fn stride_for(&self, country_code: &str) -> usize {
        self.stride_overrides
            .get(country_code)
            .copied()
            .unwrap_or(self.default_stride)
            .max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Nearest shifted points consulted per query
    pub neighbours: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { neighbours: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Entries with more runs than this are re-examined even with a single label
    pub max_plausible_crossings: usize,

    /// Neighbours further apart than this (km) are not trusted as evidence
    pub reliable_gap_km: f64,

    /// Tracks with at most this many entries are left untouched
    pub min_track_len: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_plausible_crossings: 3,
            reliable_gap_km: 5.0,
            min_track_len: 3,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.boundary;
        for (field, value) in [
            ("boundary.standard_offset", b.standard_offset),
            ("boundary.enclave_offset", b.enclave_offset),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "a finite number", value));
            }
        }
        if b.enclave_offset.abs() <= b.standard_offset.abs() {
            return Err(ConfigError::invalid(
                "boundary.enclave_offset",
                "larger in magnitude than boundary.standard_offset",
                b.enclave_offset,
            ));
        }
        if let Some(spacing) = b.max_point_spacing {
            if !(spacing.is_finite() && spacing >= MIN_POINT_SPACING) {
                return Err(ConfigError::invalid(
                    "boundary.max_point_spacing",
                    "a number of at least 1e-6",
                    spacing,
                ));
            }
        }
        if !(b.coincidence_tolerance.is_finite() && b.coincidence_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "boundary.coincidence_tolerance",
                "a positive number",
                b.coincidence_tolerance,
            ));
        }
        if b.min_offset_vertices < 3 {
            return Err(ConfigError::invalid(
                "boundary.min_offset_vertices",
                "at least 3",
                b.min_offset_vertices,
            ));
        }
        if b.default_stride == 0 {
            return Err(ConfigError::invalid("boundary.default_stride", "at least 1", 0));
        }
        if let Some((cc, _)) = b.stride_overrides.iter().find(|(_, s)| **s == 0) {
            return Err(ConfigError::invalid(
                format!("boundary.stride_overrides.{cc}"),
                "at least 1",
                0,
            ));
        }
        b.join_style.validate()?;
        if self.index.neighbours == 0 {
            return Err(ConfigError::invalid("index.neighbours", "at least 1", 0));
        }
        if !(self.track.reliable_gap_km.is_finite() && self.track.reliable_gap_km >= 0.0) {
            return Err(ConfigError::invalid(
                "track.reliable_gap_km",
                "a non-negative number",
                self.track.reliable_gap_km,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.boundary.offset_class("LS"), OffsetClass::Enclave);
        assert_eq!(config.boundary.offset_class("ZA"), OffsetClass::Standard);
        assert!(config.boundary.offset_for("VA") > config.boundary.offset_for("IT") * 5.0);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [boundary]
            standard_offset = 0.0002
            default_stride = 2

            [boundary.stride_overrides]
            JP = 50

            [boundary.join_style]
            kind = "round"
            step = 0.25

            [track]
            reliable_gap_km = 7.5
            "#,
        )
        .unwrap();

        assert_eq!(config.boundary.standard_offset, 0.0002);
        assert_eq!(config.boundary.stride_for("JP"), 50);
        assert_eq!(config.boundary.stride_for("FR"), 2);
        assert_eq!(config.boundary.join_style, JoinStyle::Round { step: 0.25 });
        assert_eq!(config.track.reliable_gap_km, 7.5);
        // untouched sections keep their defaults
        assert_eq!(config.index.neighbours, 2);
        assert_eq!(config.boundary.offset_class("SM"), OffsetClass::Enclave);
    }

    #[test]
    fn test_enclave_offset_must_dominate() {
        let err = EngineConfig::from_toml_str(
            r#"
            [boundary]
            standard_offset = 0.01
            enclave_offset = 0.001
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("boundary.enclave_offset"));
    }

    #[test]
    fn test_zero_neighbours_rejected() {
        let mut config = EngineConfig::default();
        config.index.neighbours = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "index.neighbours"
        ));
    }

    #[test]
    fn test_tiny_point_spacing_rejected() {
        let mut config = EngineConfig::default();
        config.boundary.max_point_spacing = Some(1e-12);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "boundary.max_point_spacing"
        ));

        config.boundary.max_point_spacing = Some(MIN_POINT_SPACING);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_winding_from_area() {
        assert_eq!(Winding::of_signed_area(-2.0), Winding::Clockwise);
        assert_eq!(Winding::of_signed_area(3.0), Winding::CounterClockwise);
    }
}
