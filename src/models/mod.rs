//! Core data models for point and track attribution.

pub mod boundary;
pub mod place;
pub mod resolution;

pub use boundary::{CountryRings, Feature, FeatureId, RingRole, ShiftedBoundaryPoint};
pub use place::{Coordinate, QueryPoint, Track};
pub use resolution::{CountryLabel, Resolution, ResolvedPoint, Settlement};
