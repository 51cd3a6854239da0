//! Boundary builder: raw country rings into features and the shifted boundary.
//!
//! Every ring becomes a [`Feature`] with its own id. The ring is then moved inward
//! (the country's territory shrinks) and the resulting vertices are emitted as
//! [`ShiftedBoundaryPoint`]s, which are what the nearest-neighbour index stores.
//! Shrinking keeps the shared border of two neighbours from producing two identical
//! point sets.

use hashbrown::HashSet;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::geometry::{
    densify_ring, distinct_vertex_count, offset_ring_or_original, signed_area_and_centroid,
};
use crate::config::{BoundaryConfig, Winding};
use crate::models::{Coordinate, CountryRings, Feature, FeatureId, RingRole, ShiftedBoundaryPoint};

const UNGROUPED: &str = "ungrouped";

/// A raw vertex, by feature and position in its ring
type VertexRef = (FeatureId, usize);

/// Features plus the flattened shifted boundary derived from them.
#[derive(Debug, Clone, Default)]
pub struct BoundaryTable {
    /// Sorted by feature id
    pub features: Vec<Feature>,
    /// Grouped by feature, features in id order
    pub points: Vec<ShiftedBoundaryPoint>,
}

impl BoundaryTable {
    pub fn feature(&self, feature_id: FeatureId) -> Option<&Feature> {
        self.features
            .binary_search_by_key(&feature_id, |f| f.feature_id)
            .ok()
            .map(|i| &self.features[i])
    }

    /// Distinct country codes, sorted
    pub fn country_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.country_code.as_str())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    pub fn features_for<'a>(&'a self, country_code: &'a str) -> impl Iterator<Item = &'a Feature> {
        self.features
            .iter()
            .filter(move |f| f.country_code == country_code)
    }

    pub fn points_for(&self, feature_id: FeatureId) -> impl Iterator<Item = &ShiftedBoundaryPoint> {
        self.points
            .iter()
            .filter(move |p| p.feature_id == feature_id)
    }

    pub fn border_adjacent_count(&self) -> usize {
        self.points.iter().filter(|p| p.border_adjacent).count()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Build features and the shifted boundary from raw country rings.
///
/// Feature ids are assigned in input order, so the same input always yields the same
/// table. Countries are processed in parallel per `group`.
pub fn build_boundary_table(countries: &[CountryRings], config: &BoundaryConfig) -> BoundaryTable {
    info!("Building shifted boundary for {} countries...", countries.len());

    let (features, groups) = collect_features(countries, config);
    let raw_vertices: usize = features.iter().map(|f| f.ring.len()).sum();

    let shared = shared_vertices(&features, config.coincidence_tolerance);
    debug!("{} raw vertices shared between features", shared.len());

    let groups: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
    let mut shifted: Vec<(FeatureId, Vec<ShiftedBoundaryPoint>)> = groups
        .par_iter()
        .map(|(group, members)| {
            debug!("Shifting group {} ({} rings)", group, members.len());
            members
                .iter()
                .map(|&i| {
                    let feature = &features[i];
                    (feature.feature_id, shift_feature(feature, &shared, config))
                })
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect();
    shifted.sort_by_key(|(id, _)| *id);

    let points: Vec<ShiftedBoundaryPoint> = shifted.into_iter().flat_map(|(_, p)| p).collect();

    let table = BoundaryTable { features, points };
    info!(
        "Shifted boundary built: {} features, {} raw vertices, {} points ({} border-adjacent)",
        table.features.len(),
        raw_vertices,
        table.points.len(),
        table.border_adjacent_count()
    );
    table
}

/// Assign feature ids and ring roles. Returns the features and, per group, the
/// indices of its features.
fn collect_features(
    countries: &[CountryRings],
    config: &BoundaryConfig,
) -> (Vec<Feature>, BTreeMap<String, Vec<usize>>) {
    let mut features = Vec::new();
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut next_id: FeatureId = 0;

    for country in countries {
        for raw in &country.rings {
            let ring: Vec<Coordinate> = raw.iter().copied().filter(Coordinate::is_valid).collect();
            if ring.len() != raw.len() {
                warn!(
                    "Dropped {} invalid vertices from a {} ring",
                    raw.len() - ring.len(),
                    country.country_code
                );
            }
            if ring.is_empty() {
                warn!("Skipping empty ring of {}", country.country_code);
                continue;
            }

            let feature = Feature {
                feature_id: next_id,
                country_code: country.country_code.clone(),
                role: ring_role(&ring, config.outer_winding),
                ring,
            };
            next_id += 1;

            let group = country.group.as_deref().unwrap_or(UNGROUPED).to_string();
            groups.entry(group).or_default().push(features.len());
            features.push(feature);
        }
    }

    (features, groups)
}

/// Rings wound like outer rings (and rings without area) are `Outer`, the rest are
/// enclave holes.
fn ring_role(ring: &[Coordinate], outer_winding: Winding) -> RingRole {
    if distinct_vertex_count(ring) < 3 {
        return RingRole::Outer;
    }
    let (area, _) = signed_area_and_centroid(ring);
    if area == 0.0 || Winding::of_signed_area(area) == outer_winding {
        RingRole::Outer
    } else {
        RingRole::Hole
    }
}

/// `(feature, vertex index)` of every raw vertex that has a vertex of another
/// feature within `tolerance`.
fn shared_vertices(features: &[Feature], tolerance: f64) -> HashSet<VertexRef> {
    let raw: Vec<GeomWithData<[f64; 2], VertexRef>> = features
        .iter()
        .flat_map(|f| {
            f.ring
                .iter()
                .enumerate()
                .map(move |(i, c)| GeomWithData::new(c.key(), (f.feature_id, i)))
        })
        .collect();
    let tree = RTree::bulk_load(raw);
    let radius_2 = tolerance * tolerance;

    tree.iter()
        .filter(|v| {
            tree.locate_within_distance(*v.geom(), radius_2)
                .any(|other| other.data.0 != v.data.0)
        })
        .map(|v| v.data)
        .collect()
}

fn shift_feature(
    feature: &Feature,
    shared: &HashSet<VertexRef>,
    config: &BoundaryConfig,
) -> Vec<ShiftedBoundaryPoint> {
    let magnitude = config.offset_for(&feature.country_code);
    // growing a hole shrinks the country around it
    let distance = match feature.role {
        RingRole::Outer => -magnitude,
        RingRole::Hole => magnitude,
    };

    let mut shifted = offset_ring_or_original(
        &feature.ring,
        distance,
        config.join_style,
        config.min_offset_vertices,
    );
    if shifted.len() > 1 && shifted.first() == shifted.last() {
        shifted.pop();
    }
    if let Some(spacing) = config.max_point_spacing {
        shifted = densify_ring(&shifted, spacing);
    }

    // shifted vertices inherit the flag of the nearest raw vertex
    let raw: Vec<GeomWithData<[f64; 2], bool>> = feature
        .ring
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let contested = shared.contains(&(feature.feature_id, i));
            GeomWithData::new(c.key(), contested)
        })
        .collect();
    let raw_tree = RTree::bulk_load(raw);

    let stride = config.stride_for(&feature.country_code);

    shifted
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let border_adjacent = raw_tree
                .nearest_neighbor(&c.key())
                .map(|n| n.data)
                .unwrap_or(false);
            (border_adjacent || i % stride == 0).then(|| ShiftedBoundaryPoint {
                coordinate: *c,
                country_code: feature.country_code.clone(),
                feature_id: feature.feature_id,
                border_adjacent,
            })
        })
        .collect()
}
