//! Country attribution by point-in-polygon over a shifted boundary.
//!
//! Country rings are shrunk inward and their vertices indexed in an R-tree.
//! The nearest shifted points of a query name the candidate countries, exact
//! ring tests on the original geometry decide between them.

mod boundary;
pub mod geometry;
mod index;
mod service;

#[cfg(test)]
pub(crate) mod fixtures;

pub use boundary::{build_boundary_table, BoundaryTable};
pub use geometry::{
    densify_ring, offset_ring, point_in_polygon, points_in_polygon, BoundingBox, JoinStyle,
};
pub use index::{BoundaryIndex, Candidate};
pub use service::{build_boundary_index, resolve_point, resolve_track, Resolver};
