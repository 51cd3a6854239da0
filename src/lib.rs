//! Borderline - attributes GPS points and tracks to countries, regions and settlements
//!
//! Boundary rings are shifted inward and indexed once per process; points are then
//! resolved against the index, refined with exact point-in-polygon tests, and
//! optionally disambiguated along the track they belong to.

pub mod config;
pub mod error;
pub mod gazetteer;
pub mod models;
pub mod pip;
pub mod tables;
pub mod track;

pub use config::EngineConfig;
pub use gazetteer::{City, Gazetteer};
pub use models::{Coordinate, CountryLabel, CountryRings, QueryPoint, Resolution, Track};
pub use pip::{build_boundary_index, resolve_point, resolve_track, BoundaryIndex, Resolver};
