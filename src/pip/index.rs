//! Nearest-neighbour index over the shifted boundary, and country resolution.

use hashbrown::HashMap;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::{debug, info, warn};

use super::boundary::BoundaryTable;
use super::geometry::{point_in_polygon, BoundingBox};
use crate::config::EngineConfig;
use crate::models::{
    Coordinate, CountryLabel, Feature, FeatureId, Resolution, RingRole, ShiftedBoundaryPoint,
};

/// A feature together with its cached bounds
#[derive(Debug, Clone)]
struct IndexedFeature {
    feature: Feature,
    bbox: Option<BoundingBox>,
}

impl IndexedFeature {
    fn new(feature: Feature) -> Self {
        let bbox = BoundingBox::of(&feature.ring);
        Self { feature, bbox }
    }

    /// The original ring contains the point
    fn contains(&self, c: Coordinate) -> bool {
        self.bbox.is_some_and(|b| b.contains(c)) && point_in_polygon(c, &self.feature.ring)
    }

    /// The point lies in territory this ring bounds
    fn claims(&self, c: Coordinate) -> bool {
        self.feature.role == RingRole::Outer && self.contains(c)
    }
}

/// A feature seen among the nearest shifted points of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub country_code: String,
    pub feature_id: FeatureId,
    /// Planar distance (degrees) to the closest point of this feature
    pub distance: f64,
}

/// Read-only index over a [`BoundaryTable`]. Safe to share across threads.
pub struct BoundaryIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
    points: Vec<ShiftedBoundaryPoint>,
    features: HashMap<FeatureId, IndexedFeature>,
    by_country: HashMap<String, Vec<FeatureId>>,
    config: EngineConfig,
}

impl BoundaryIndex {
    pub fn build(table: BoundaryTable, config: EngineConfig) -> Self {
        info!(
            "Building boundary index for {} points of {} features...",
            table.points.len(),
            table.features.len()
        );

        let entries: Vec<GeomWithData<[f64; 2], usize>> = table
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(p.coordinate.key(), i))
            .collect();
        let tree = RTree::bulk_load(entries);

        let mut by_country: HashMap<String, Vec<FeatureId>> = HashMap::new();
        let mut features = HashMap::with_capacity(table.features.len());
        for feature in table.features {
            by_country
                .entry(feature.country_code.clone())
                .or_default()
                .push(feature.feature_id);
            features.insert(feature.feature_id, IndexedFeature::new(feature));
        }

        info!(
            "Boundary index built with {} entries across {} countries",
            tree.size(),
            by_country.len()
        );

        Self {
            tree,
            points: table.points,
            features,
            by_country,
            config,
        }
    }

    /// Distinct `(country, feature)` pairs among the nearest shifted points, nearest first.
    pub fn candidates(&self, coordinate: Coordinate) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        if !coordinate.is_finite() {
            return candidates;
        }

        for (entry, distance_2) in self
            .tree
            .nearest_neighbor_iter_with_distance_2(&coordinate.key())
            .take(self.config.index.neighbours)
        {
            let point = &self.points[entry.data];
            let seen = candidates.iter().any(|c| {
                c.feature_id == point.feature_id && c.country_code == point.country_code
            });
            if !seen {
                candidates.push(Candidate {
                    country_code: point.country_code.clone(),
                    feature_id: point.feature_id,
                    distance: distance_2.sqrt(),
                });
            }
        }

        candidates
    }

    /// Attribute a coordinate to a country.
    ///
    /// One nearby feature settles it directly. Otherwise the candidates' original
    /// rings are tested for containment, and if that does not single out a country,
    /// every ring of every candidate country is tested with even-odd parity, which
    /// lets an enclave's hole ring cancel the surrounding country's outer ring.
    /// Next to a hole ring the enclave itself may not be among the candidates, so
    /// that case finally looks at every country. What is still tied comes back as
    /// [`CountryLabel::Ambiguous`].
    pub fn resolve(&self, coordinate: Coordinate) -> Resolution {
        if !coordinate.is_valid() {
            warn!("Cannot resolve invalid coordinate {:?}", coordinate);
            return Resolution::unknown();
        }

        let candidates = self.candidates(coordinate);
        let Some(nearest) = candidates.first() else {
            return Resolution::unknown();
        };
        let distance = nearest.distance;

        // a lone hole ring does not say which side of it the point is on
        let near_hole = candidates.iter().any(|c| self.is_hole(c.feature_id));
        if candidates.len() == 1 && !near_hole {
            return Resolution::new(
                CountryLabel::resolved(nearest.country_code.as_str()),
                Some(nearest.feature_id),
                distance,
            );
        }

        if let Some((code, feature_id)) = self.refine_by_containment(coordinate, &candidates) {
            debug!("{:?} resolved to {} by containment", coordinate, code);
            return Resolution::new(CountryLabel::resolved(code), Some(feature_id), distance);
        }

        let mut codes: Vec<&str> = Vec::new();
        for c in &candidates {
            if !codes.contains(&c.country_code.as_str()) {
                codes.push(&c.country_code);
            }
        }

        if let Some((code, feature_id)) = self.refine_by_country_parity(coordinate, &codes) {
            debug!("{:?} resolved to {} by country parity", coordinate, code);
            return Resolution::new(CountryLabel::resolved(code), feature_id, distance);
        }

        if near_hole {
            if let Some((code, feature_id)) = self.refine_by_enclosing_country(coordinate) {
                debug!("{:?} resolved to {} inside an enclave hole", coordinate, code);
                return Resolution::new(CountryLabel::resolved(code), Some(feature_id), distance);
            }
        }

        let label = CountryLabel::from_codes(codes.iter().copied());
        let feature_id = (!label.is_ambiguous()).then_some(nearest.feature_id);
        debug!("{:?} left as {}", coordinate, label);
        Resolution::new(label, feature_id, distance)
    }

    /// [`Self::resolve`] over many coordinates on the rayon pool, order preserved.
    pub fn resolve_many(&self, coordinates: &[Coordinate]) -> Vec<Resolution> {
        coordinates.par_iter().map(|c| self.resolve(*c)).collect()
    }

    /// Exactly one country among the candidates claims the point.
    fn refine_by_containment<'a>(
        &self,
        coordinate: Coordinate,
        candidates: &'a [Candidate],
    ) -> Option<(&'a str, FeatureId)> {
        let mut claims = candidates.iter().filter(|c| {
            self.features
                .get(&c.feature_id)
                .is_some_and(|f| f.claims(coordinate))
        });

        let first = claims.next()?;
        if claims.any(|c| c.country_code != first.country_code) {
            return None;
        }
        Some((first.country_code.as_str(), first.feature_id))
    }

    /// Exactly one of `codes` has an odd number of rings around the point.
    fn refine_by_country_parity<'a>(
        &self,
        coordinate: Coordinate,
        codes: &[&'a str],
    ) -> Option<(&'a str, Option<FeatureId>)> {
        let mut winners = codes.iter().copied().filter(|code| {
            let inside = self
                .country_features(code)
                .filter(|f| f.contains(coordinate))
                .count();
            inside % 2 == 1
        });

        let winner = winners.next()?;
        if winners.next().is_some() {
            return None;
        }

        let feature_id = self
            .country_features(winner)
            .find(|f| f.claims(coordinate))
            .map(|f| f.feature.feature_id);
        Some((winner, feature_id))
    }

    /// Beyond the candidates: exactly one country anywhere both claims the point and
    /// has odd parity around it.
    fn refine_by_enclosing_country(&self, coordinate: Coordinate) -> Option<(&str, FeatureId)> {
        let mut found: Option<(&str, FeatureId)> = None;
        for (code, ids) in &self.by_country {
            let Some(claim) = ids
                .iter()
                .filter_map(|id| self.features.get(id))
                .find(|f| f.claims(coordinate))
            else {
                continue;
            };
            let inside = self
                .country_features(code)
                .filter(|f| f.contains(coordinate))
                .count();
            if inside % 2 == 1 {
                if found.is_some() {
                    return None;
                }
                found = Some((code.as_str(), claim.feature.feature_id));
            }
        }
        found
    }

    fn is_hole(&self, feature_id: FeatureId) -> bool {
        self.features
            .get(&feature_id)
            .is_some_and(|f| f.feature.role == RingRole::Hole)
    }

    fn country_features<'a>(&'a self, code: &str) -> impl Iterator<Item = &'a IndexedFeature> + 'a {
        self.by_country
            .get(code)
            .into_iter()
            .flatten()
            .filter_map(|id| self.features.get(id))
    }

    pub fn feature(&self, feature_id: FeatureId) -> Option<&Feature> {
        self.features.get(&feature_id).map(|f| &f.feature)
    }

    pub fn features_for<'a>(&'a self, country_code: &str) -> impl Iterator<Item = &'a Feature> + 'a {
        self.country_features(country_code).map(|f| &f.feature)
    }

    /// Indexed shifted points
    pub fn points(&self) -> &[ShiftedBoundaryPoint] {
        &self.points
    }

    /// Distinct country codes, sorted
    pub fn country_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.by_country.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
