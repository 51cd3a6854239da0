//! Geometry kernel: point-in-ring tests, ring area / centroid and ring offsetting.
//!
//! Rings are plain coordinate slices. The closing vertex is optional, every
//! function wraps from the last vertex back to the first.

use geo::algorithm::buffer::{Buffer, BufferStyle, LineJoin};
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Centroid, Coord, LineString, Polygon};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, GeometryError};
use crate::models::Coordinate;

/// Batches at least this large are evaluated on the rayon pool
const PARALLEL_BATCH_THRESHOLD: usize = 512;

/// Corner treatment when offsetting a ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinStyle {
    /// Sharp corners, clipped once they exceed `limit` times the offset distance
    Miter { limit: f64 },
    /// Arcs approximated with segments of `step` radians
    Round { step: f64 },
    Bevel,
}

impl Default for JoinStyle {
    fn default() -> Self {
        JoinStyle::Miter { limit: 2.0 }
    }
}

impl JoinStyle {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            JoinStyle::Miter { limit } if !(limit.is_finite() && limit >= 1.0) => Err(
                ConfigError::invalid("boundary.join_style.limit", "at least 1", limit),
            ),
            JoinStyle::Round { step }
                if !(step.is_finite() && step > 0.0 && step < std::f64::consts::PI) =>
            {
                Err(ConfigError::invalid(
                    "boundary.join_style.step",
                    "between 0 and pi radians",
                    step,
                ))
            }
            _ => Ok(()),
        }
    }
}

impl From<JoinStyle> for LineJoin<f64> {
    fn from(style: JoinStyle) -> Self {
        match style {
            JoinStyle::Miter { limit } => LineJoin::Miter(limit),
            JoinStyle::Round { step } => LineJoin::Round(step),
            JoinStyle::Bevel => LineJoin::Bevel,
        }
    }
}

/// Axis-aligned bounds of a ring, used to reject points cheaply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn of(ring: &[Coordinate]) -> Option<Self> {
        let first = ring.first()?;
        let init = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(ring.iter().fold(init, |b, c| Self {
            min_lat: b.min_lat.min(c.lat),
            max_lat: b.max_lat.max(c.lat),
            min_lon: b.min_lon.min(c.lon),
            max_lon: b.max_lon.max(c.lon),
        }))
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.lat >= self.min_lat && c.lat <= self.max_lat && c.lon >= self.min_lon && c.lon <= self.max_lon
    }
}

/// Ray-casting point-in-ring test.
///
/// A ray is cast from the point towards increasing longitude. An edge counts when
/// the point's latitude is above the lower end (strict) and at or below the upper
/// end (inclusive), so a vertex shared by two edges is crossed once, and the edge
/// meets the ray east of the point. Horizontal edges never count.
pub fn point_in_polygon(point: Coordinate, ring: &[Coordinate]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let (lat, lon) = (point.lat, point.lon);
    let mut inside = false;
    let mut p1 = ring[n - 1];

    for &p2 in ring {
        if lat > p1.lat.min(p2.lat) && lat <= p1.lat.max(p2.lat) {
            let x = (lat - p1.lat) * (p2.lon - p1.lon) / (p2.lat - p1.lat) + p1.lon;
            if x > lon {
                inside = !inside;
            }
        }
        p1 = p2;
    }

    inside
}

/// [`point_in_polygon`] for many points against one ring.
///
/// Points outside the ring's bounding box are rejected without walking the edges,
/// which cannot change the result of the ray test.
pub fn points_in_polygon(points: &[Coordinate], ring: &[Coordinate]) -> Vec<bool> {
    let Some(bbox) = BoundingBox::of(ring) else {
        return vec![false; points.len()];
    };

    let test = |p: &Coordinate| bbox.contains(*p) && point_in_polygon(*p, ring);

    if points.len() >= PARALLEL_BATCH_THRESHOLD {
        points.par_iter().map(test).collect()
    } else {
        points.iter().map(test).collect()
    }
}

/// Shoelace signed area (square degrees) and centroid of a ring.
///
/// The area is positive for counter-clockwise rings in (lon, lat) space. A ring with
/// zero area gets the centroid of its outline, an empty ring a NaN centroid.
pub fn signed_area_and_centroid(ring: &[Coordinate]) -> (f64, Coordinate) {
    let polygon = to_polygon(ring);
    let area = polygon.signed_area();
    let centroid = polygon
        .centroid()
        .map(|p| Coordinate::new(p.y(), p.x()))
        .unwrap_or(Coordinate::new(f64::NAN, f64::NAN));
    (area, centroid)
}

/// Number of vertices, not counting a closing vertex equal to the first.
pub fn distinct_vertex_count(ring: &[Coordinate]) -> usize {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => ring.len() - 1,
        _ => ring.len(),
    }
}

/// Offset a ring by `distance` degrees; negative distances shrink it.
///
/// Rings with fewer than `min_vertices` distinct vertices and zero distances come back
/// unchanged. When the offset splits the ring, the largest piece is kept. An offset
/// that leaves nothing usable is a [`GeometryError::DegenerateRingOffset`].
pub fn offset_ring(
    ring: &[Coordinate],
    distance: f64,
    join_style: JoinStyle,
    min_vertices: usize,
) -> Result<Vec<Coordinate>, GeometryError> {
    let vertices = distinct_vertex_count(ring);
    if vertices < min_vertices || distance == 0.0 {
        return Ok(ring.to_vec());
    }

    let degenerate = GeometryError::DegenerateRingOffset { distance, vertices };

    let style = BufferStyle::new(distance).line_join(join_style.into());
    let buffered = to_polygon(ring)
        .orient(Direction::Default)
        .buffer_with_style(style);

    let largest = buffered
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .ok_or_else(|| degenerate.clone())?;

    let mut coords: Vec<Coordinate> = largest
        .exterior()
        .coords()
        .map(|c| Coordinate::from(*c))
        .collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }

    if coords.len() < 3 || coords.iter().any(|c| !c.is_finite()) {
        return Err(degenerate);
    }

    Ok(coords)
}

/// [`offset_ring`], falling back to the unmodified ring when the offset degenerates.
pub fn offset_ring_or_original(
    ring: &[Coordinate],
    distance: f64,
    join_style: JoinStyle,
    min_vertices: usize,
) -> Vec<Coordinate> {
    match offset_ring(ring, distance, join_style, min_vertices) {
        Ok(shifted) => shifted,
        Err(e) => {
            debug!("Keeping ring un-shifted: {}", e);
            ring.to_vec()
        }
    }
}

/// Upper bound on the pieces one edge is split into by [`densify_ring`]
pub const MAX_PIECES_PER_EDGE: usize = 10_000;

/// Insert evenly spaced points so no edge of the closed ring is longer than
/// `max_spacing` degrees. Existing vertices are kept in place. An edge is split
/// into at most [`MAX_PIECES_PER_EDGE`] pieces.
pub fn densify_ring(ring: &[Coordinate], max_spacing: f64) -> Vec<Coordinate> {
    if ring.len() < 2 || !(max_spacing > 0.0) {
        return ring.to_vec();
    }

    let mut dense = Vec::with_capacity(ring.len());
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        dense.push(*a);

        let pieces = (a.planar_distance(&b) / max_spacing).ceil();
        if pieces.is_finite() && pieces > 1.0 {
            let n = (pieces as usize).min(MAX_PIECES_PER_EDGE);
            for k in 1..n {
                let t = k as f64 / n as f64;
                dense.push(Coordinate::new(
                    a.lat + (b.lat - a.lat) * t,
                    a.lon + (b.lon - a.lon) * t,
                ));
            }
        }
    }
    dense
}

fn to_polygon(ring: &[Coordinate]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|c| Coord::from(*c)).collect();
    Polygon::new(LineString::new(coords), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<Coordinate> {
        vec![
            Coordinate::new(min, min),
            Coordinate::new(max, min),
            Coordinate::new(max, max),
            Coordinate::new(min, max),
        ]
    }

    #[test]
    fn test_point_in_square() {
        let ring = square(0.0, 1.0);
        assert!(point_in_polygon(Coordinate::new(0.5, 0.5), &ring));
        assert!(!point_in_polygon(Coordinate::new(1.5, 0.5), &ring));
        assert!(!point_in_polygon(Coordinate::new(0.5, -0.5), &ring));
        assert!(!point_in_polygon(Coordinate::new(0.5, 1.5), &ring));
    }

    #[test]
    fn test_closing_vertex_is_optional() {
        let open = square(0.0, 1.0);
        let mut closed = open.clone();
        closed.push(open[0]);
        for p in [(0.5, 0.5), (0.2, 0.9), (1.2, 0.3), (0.0001, 0.9999)] {
            let p = Coordinate::from(p);
            assert_eq!(point_in_polygon(p, &open), point_in_polygon(p, &closed));
        }
    }

    #[test]
    fn test_ray_through_vertex_counts_once() {
        // diamond: the ray from the centre passes exactly through the east vertex
        let ring = vec![
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 2.0),
            Coordinate::new(2.0, 1.0),
            Coordinate::new(1.0, 0.0),
        ];
        assert!(point_in_polygon(Coordinate::new(1.0, 1.0), &ring));
        assert!(!point_in_polygon(Coordinate::new(1.0, -0.5), &ring));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening to the north
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 3.0),
            Coordinate::new(3.0, 3.0),
            Coordinate::new(3.0, 2.0),
            Coordinate::new(1.0, 2.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(3.0, 1.0),
            Coordinate::new(3.0, 0.0),
        ];
        assert!(point_in_polygon(Coordinate::new(2.0, 0.5), &ring));
        assert!(point_in_polygon(Coordinate::new(2.0, 2.5), &ring));
        assert!(!point_in_polygon(Coordinate::new(2.0, 1.5), &ring));
    }

    #[test]
    fn test_degenerate_ring_contains_nothing() {
        let ring = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)];
        assert!(!point_in_polygon(Coordinate::new(0.5, 0.5), &ring));
    }

    #[test]
    fn test_batch_matches_scalar() {
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(4.0, 1.0),
            Coordinate::new(3.0, 5.0),
            Coordinate::new(1.0, 3.0),
        ];
        let points: Vec<Coordinate> = (0..2000)
            .map(|i| {
                let f = i as f64;
                Coordinate::new((f * 0.37) % 6.0 - 1.0, (f * 0.53) % 7.0 - 1.0)
            })
            .collect();

        let batch = points_in_polygon(&points, &ring);
        assert_eq!(batch.len(), points.len());
        for (p, inside) in points.iter().zip(&batch) {
            assert_eq!(*inside, point_in_polygon(*p, &ring), "mismatch at {p:?}");
        }
        assert!(batch.iter().any(|b| *b));
        assert!(batch.iter().any(|b| !*b));
    }

    #[test]
    fn test_signed_area_tracks_winding() {
        // (lat, lon) order: lon goes 0 -> 0 -> 2 -> 2, lat 0 -> 2 -> 2 -> 0
        // which in (x=lon, y=lat) is clockwise
        let cw = square(0.0, 2.0);
        let (area, centroid) = signed_area_and_centroid(&cw);
        assert!((area + 4.0).abs() < 1e-12, "got {area}");
        assert!((centroid.lat - 1.0).abs() < 1e-12);
        assert!((centroid.lon - 1.0).abs() < 1e-12);

        let ccw: Vec<Coordinate> = cw.iter().rev().copied().collect();
        let (area, _) = signed_area_and_centroid(&ccw);
        assert!((area - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_shrinks_square() {
        let ring = square(0.0, 1.0);
        let shrunk = offset_ring(&ring, -0.1, JoinStyle::default(), 4).unwrap();
        assert!(shrunk.len() >= 4);
        for c in &shrunk {
            assert!(point_in_polygon(*c, &ring));
            assert!(c.lat > 0.09 && c.lat < 0.91, "{c:?}");
            assert!(c.lon > 0.09 && c.lon < 0.91, "{c:?}");
        }
    }

    #[test]
    fn test_offset_grows_with_positive_distance() {
        let ring = square(0.0, 1.0);
        let grown = offset_ring(&ring, 0.1, JoinStyle::Bevel, 4).unwrap();
        for c in &grown {
            assert!(!point_in_polygon(*c, &ring));
        }
    }

    #[test]
    fn test_small_ring_is_not_offset() {
        let triangle = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(0.0, 0.0),
        ];
        let out = offset_ring(&triangle, -0.1, JoinStyle::default(), 4).unwrap();
        assert_eq!(out, triangle);
    }

    #[test]
    fn test_collapsing_offset_falls_back() {
        let ring = square(0.0, 1.0);
        let err = offset_ring(&ring, -2.0, JoinStyle::default(), 4).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateRingOffset { vertices: 4, .. }));

        let kept = offset_ring_or_original(&ring, -2.0, JoinStyle::default(), 4);
        assert_eq!(kept, ring);
    }

    #[test]
    fn test_join_style_validation() {
        assert!(JoinStyle::Miter { limit: 0.5 }.validate().is_err());
        assert!(JoinStyle::Round { step: 0.0 }.validate().is_err());
        assert!(JoinStyle::Bevel.validate().is_ok());
    }

    #[test]
    fn test_densify_closes_the_ring() {
        let ring = square(0.0, 1.0);
        let dense = densify_ring(&ring, 0.3);
        // four edges of length 1, split into 4 pieces each
        assert_eq!(dense.len(), 16);
        assert_eq!(dense[0], ring[0]);
        assert_eq!(dense[4], ring[1]);
        assert_eq!(dense[1], Coordinate::new(0.25, 0.0));
        assert_eq!(dense[15], Coordinate::new(0.0, 0.25));

        assert_eq!(densify_ring(&ring, 5.0), ring);
    }

    #[test]
    fn test_densify_caps_pieces_per_edge() {
        let ring = square(0.0, 1.0);
        let dense = densify_ring(&ring, 1e-12);
        assert_eq!(dense.len(), 4 * MAX_PIECES_PER_EDGE);
        assert_eq!(dense[MAX_PIECES_PER_EDGE], ring[1]);
    }
}
