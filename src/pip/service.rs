//! Resolution entry points: single points, tracks and whole activities.

use rayon::prelude::*;
use tracing::{debug, info};

use super::boundary::build_boundary_table;
use super::index::BoundaryIndex;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::gazetteer::Gazetteer;
use crate::models::{Coordinate, CountryRings, QueryPoint, Resolution, ResolvedPoint, Track};
use crate::track::{disambiguate, disambiguate_resolutions, TrackEntry, TrackSummary};

/// Validate `config`, shift the boundary and index it. Built once per process.
pub fn build_boundary_index(
    country_rings: &[CountryRings],
    config: &EngineConfig,
) -> Result<BoundaryIndex, ConfigError> {
    config.validate()?;
    let table = build_boundary_table(country_rings, &config.boundary);
    Ok(BoundaryIndex::build(table, config.clone()))
}

/// Country of one coordinate; settlement fields stay empty.
pub fn resolve_point(index: &BoundaryIndex, coordinate: Coordinate) -> Resolution {
    index.resolve(coordinate)
}

/// Resolve an ordered track point by point, then disambiguate along it.
pub fn resolve_track(index: &BoundaryIndex, ordered: &[Coordinate]) -> Vec<Resolution> {
    let mut resolutions = index.resolve_many(ordered);
    let corrections = disambiguate_resolutions(&mut resolutions, ordered, &index.config().track);
    debug!(
        "Track of {} points: {} reviewed, {} corrected",
        ordered.len(),
        corrections.len(),
        corrections.iter().filter(|c| c.changed()).count()
    );
    resolutions
}

/// Country resolution plus settlement lookup
pub struct Resolver {
    index: BoundaryIndex,
    gazetteer: Gazetteer,
}

impl Resolver {
    pub fn new(index: BoundaryIndex, gazetteer: Gazetteer) -> Self {
        info!(
            "Resolver ready: {} boundary points, {} cities",
            index.len(),
            gazetteer.len()
        );
        Self { index, gazetteer }
    }

    pub fn resolve_point(&self, coordinate: Coordinate) -> Resolution {
        self.settle(self.index.resolve(coordinate), coordinate)
    }

    pub fn resolve_query(&self, query: &QueryPoint) -> ResolvedPoint {
        ResolvedPoint {
            id: query.id.clone(),
            position: query.position,
            resolution: self.resolve_point(query.coordinate),
        }
    }

    /// Independent points, resolved in parallel, order preserved
    pub fn resolve_queries(&self, queries: &[QueryPoint]) -> Vec<ResolvedPoint> {
        queries.par_iter().map(|q| self.resolve_query(q)).collect()
    }

    /// [`resolve_track`], with settlements looked up after disambiguation.
    pub fn resolve_track(&self, ordered: &[Coordinate]) -> Vec<Resolution> {
        resolve_track(&self.index, ordered)
            .into_iter()
            .zip(ordered)
            .map(|(r, c)| self.settle(r, *c))
            .collect()
    }

    /// Many tracks: parallel across tracks, sequential within one.
    pub fn resolve_tracks(&self, tracks: &[Track]) -> Vec<Vec<Resolution>> {
        tracks
            .par_iter()
            .map(|t| self.resolve_track(&t.points))
            .collect()
    }

    pub fn summarise_track(&self, track: &Track) -> Option<TrackSummary> {
        let resolutions = self.resolve_track(&track.points);
        TrackSummary::from_resolutions(track.id.clone(), &track.points, &resolutions)
    }

    /// Summarise consecutive activities, then disambiguate each activity against
    /// the ones before and after it. Empty tracks are dropped.
    pub fn resolve_activities(&self, tracks: &[Track]) -> Vec<TrackSummary> {
        let mut summaries: Vec<TrackSummary> = tracks
            .par_iter()
            .filter_map(|t| self.summarise_track(t))
            .collect();

        let mut entries: Vec<TrackEntry> = summaries.iter().map(|s| s.entry.clone()).collect();
        let corrections = disambiguate(&mut entries, &self.index.config().track);
        for c in corrections.iter().filter(|c| c.changed()) {
            debug!(
                "Activity {} relabelled {} -> {}",
                summaries[c.index].id, c.before, c.after
            );
        }
        for (summary, entry) in summaries.iter_mut().zip(entries) {
            summary.entry = entry;
        }

        summaries
    }

    fn settle(&self, resolution: Resolution, coordinate: Coordinate) -> Resolution {
        let settlement = self.gazetteer.settle(&resolution.label, coordinate);
        resolution.with_settlement(settlement)
    }

    pub fn index(&self) -> &BoundaryIndex {
        &self.index
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }
}
