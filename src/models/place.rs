//! Coordinates and the query records handed to the resolver.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in degrees.
///
/// Everywhere in the crate latitude is the "y" axis and longitude the "x" axis:
/// point-in-ring rays run along longitude at constant latitude, and spatial index
/// keys are `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Finite and inside the WGS-84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Key used by the nearest-neighbour trees.
    pub fn key(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    pub fn from_key(key: [f64; 2]) -> Self {
        Self::new(key[0], key[1])
    }

    /// Planar distance in degrees, the metric of the boundary index.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }

    /// Great-circle distance in kilometres.
    pub fn haversine_km(&self, other: &Coordinate) -> f64 {
        use geo::{Distance, Haversine};
        Haversine.distance(geo::Point::from(*self), geo::Point::from(*other)) / 1000.0
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lon, y: c.lat }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Coordinate::new(c.y, c.x)
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.lon, c.lat)
    }
}

impl From<(f64, f64)> for Coordinate {
    /// `(lat, lon)`
    fn from((lat, lon): (f64, f64)) -> Self {
        Coordinate::new(lat, lon)
    }
}

/// A single coordinate to resolve, tagged with a caller identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub id: String,
    pub coordinate: Coordinate,

    /// Position within an ordered track, when the point came from one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl QueryPoint {
    pub fn new(id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            coordinate,
            position: None,
        }
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// An ordered run of coordinates sharing one external identifier (one activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub points: Vec<Coordinate>,
}

impl Track {
    pub fn new(id: impl Into<String>, points: Vec<Coordinate>) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }

    /// The track's points as query points, positions filled in.
    pub fn query_points(&self) -> Vec<QueryPoint> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, c)| QueryPoint::new(self.id.clone(), *c).at_position(i))
            .collect()
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }
}
