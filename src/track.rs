//! Track disambiguation.
//!
//! Points near a border are sometimes attributed to both sides, or flip between
//! them. Along an ordered track the neighbours of such a point usually say which
//! side it is on, so each ambiguous entry is compared with the entry before and
//! after it and corrected with the first rule that applies:
//!
//! 1. [`CorrectionRule::NoCrossing`]: both neighbours agree, the entry takes their label.
//! 2. [`CorrectionRule::CleanTransition`]: the label links the previous country to the
//!    next one, so the border really was crossed here and the entry is kept.
//! 3. [`CorrectionRule::OneSidedEvidence`]: only one neighbour is close enough to trust
//!    and it agrees with the entry, which is kept.
//! 4. [`CorrectionRule::Inconclusive`]: the entry takes the previous label.
//!
//! Entries are visited in order and later decisions see earlier corrections.
//! The first and last entries are never changed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrackConfig;
use crate::error::TrackError;
use crate::models::{Coordinate, CountryLabel, Resolution};

/// Collapse consecutive equal items into `(item, run length)` pairs.
pub fn run_length_encode<T: PartialEq + Clone>(items: &[T]) -> Vec<(T, usize)> {
    let mut runs: Vec<(T, usize)> = Vec::new();
    for item in items {
        match runs.last_mut() {
            Some((last, count)) if last == item => *count += 1,
            _ => runs.push((item.clone(), 1)),
        }
    }
    runs
}

/// Number of runs of consecutive equal items
pub fn count_runs<T: PartialEq>(items: &[T]) -> usize {
    match items.first() {
        None => 0,
        Some(_) => 1 + items.windows(2).filter(|w| w[0] != w[1]).count(),
    }
}

/// Runs of country codes within each label, in order
pub fn border_crossings(labels: &[CountryLabel]) -> Vec<usize> {
    labels.iter().map(|l| count_runs(l.codes())).collect()
}

/// One element of a track under review: a point, or a whole activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub label: CountryLabel,
    /// Runs of country codes seen while traversing the entry
    pub crossings: usize,
    pub start: Coordinate,
    pub end: Coordinate,
}

impl TrackEntry {
    pub fn from_point(label: CountryLabel, at: Coordinate) -> Self {
        let crossings = count_runs(label.codes());
        Self {
            label,
            crossings,
            start: at,
            end: at,
        }
    }

    /// Summarise consecutive point labels as one entry. `None` for an empty track.
    pub fn summarise(labels: &[CountryLabel], points: &[Coordinate]) -> Option<Self> {
        let start = *points.first()?;
        let end = *points.last()?;

        let codes: Vec<&str> = labels
            .iter()
            .flat_map(|l| l.codes().iter().map(String::as_str))
            .collect();

        Some(Self {
            label: CountryLabel::from_codes(codes.iter().copied()),
            crossings: count_runs(&codes),
            start,
            end,
        })
    }

    fn needs_review(&self, config: &TrackConfig) -> bool {
        self.label.codes().len() > 1 || self.crossings > config.max_plausible_crossings
    }
}

/// Per-activity view of a resolved track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    #[serde(flatten)]
    pub entry: TrackEntry,
    /// Distinct first-level admin names along the track, in order of appearance
    pub admin_names: Vec<String>,
}

impl TrackSummary {
    pub fn from_resolutions(
        id: impl Into<String>,
        points: &[Coordinate],
        resolutions: &[Resolution],
    ) -> Option<Self> {
        let labels: Vec<CountryLabel> = resolutions.iter().map(|r| r.label.clone()).collect();
        let entry = TrackEntry::summarise(&labels, points)?;

        let mut admin_names: Vec<String> = Vec::new();
        for r in resolutions {
            if !r.admin_name.is_empty() && !admin_names.contains(&r.admin_name) {
                admin_names.push(r.admin_name.clone());
            }
        }

        Some(Self {
            id: id.into(),
            entry,
            admin_names,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionRule {
    NoCrossing,
    CleanTransition,
    OneSidedEvidence,
    Inconclusive,
}

/// A decision taken on one reviewed entry. `before == after` when it was kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub index: usize,
    pub rule: CorrectionRule,
    pub before: CountryLabel,
    pub after: CountryLabel,
}

impl Correction {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Review every interior entry that is ambiguous or crosses implausibly often.
///
/// Tracks of `min_track_len` entries or fewer are rejected.
pub fn try_disambiguate(
    entries: &mut [TrackEntry],
    config: &TrackConfig,
) -> Result<Vec<Correction>, TrackError> {
    if entries.len() <= config.min_track_len {
        return Err(TrackError::InsufficientTrackLength {
            len: entries.len(),
            min: config.min_track_len,
        });
    }

    let mut corrections = Vec::new();
    for i in 1..entries.len() - 1 {
        if !entries[i].needs_review(config) {
            continue;
        }

        let (rule, after) = {
            let (prev, cur, next) = (&entries[i - 1], &entries[i], &entries[i + 1]);
            let rule = choose_rule(prev, cur, next, config);
            let after = match rule {
                CorrectionRule::NoCrossing | CorrectionRule::Inconclusive => prev.label.clone(),
                CorrectionRule::CleanTransition | CorrectionRule::OneSidedEvidence => {
                    cur.label.clone()
                }
            };
            (rule, after)
        };

        let before = entries[i].label.clone();
        debug!("Track entry {}: {} -> {} ({:?})", i, before, after, rule);

        if before != after {
            entries[i].crossings = count_runs(after.codes());
            entries[i].label = after.clone();
        }
        corrections.push(Correction {
            index: i,
            rule,
            before,
            after,
        });
    }

    Ok(corrections)
}

/// [`try_disambiguate`], leaving short tracks untouched.
pub fn disambiguate(entries: &mut [TrackEntry], config: &TrackConfig) -> Vec<Correction> {
    match try_disambiguate(entries, config) {
        Ok(corrections) => corrections,
        Err(e) => {
            debug!("Skipping disambiguation: {}", e);
            Vec::new()
        }
    }
}

/// Disambiguate per-point resolutions of one ordered track in place.
pub fn disambiguate_resolutions(
    resolutions: &mut [Resolution],
    points: &[Coordinate],
    config: &TrackConfig,
) -> Vec<Correction> {
    let mut entries: Vec<TrackEntry> = resolutions
        .iter()
        .zip(points)
        .map(|(r, c)| TrackEntry::from_point(r.label.clone(), *c))
        .collect();

    let corrections = disambiguate(&mut entries, config);
    for c in corrections.iter().filter(|c| c.changed()) {
        let r = &mut resolutions[c.index];
        r.label = c.after.clone();
        // no longer backed by a single feature
        r.feature_id = None;
    }
    corrections
}

fn choose_rule(
    prev: &TrackEntry,
    cur: &TrackEntry,
    next: &TrackEntry,
    config: &TrackConfig,
) -> CorrectionRule {
    if prev.label == next.label {
        return CorrectionRule::NoCrossing;
    }

    let enters = prev.label.last().is_some() && prev.label.last() == cur.label.first();
    let leaves = cur.label.last().is_some() && cur.label.last() == next.label.first();
    if enters && leaves {
        return CorrectionRule::CleanTransition;
    }

    let prev_reliable = prev.end.haversine_km(&cur.start) <= config.reliable_gap_km;
    let next_reliable = cur.end.haversine_km(&next.start) <= config.reliable_gap_km;
    let prev_consistent = prev.label.last().is_some_and(|c| cur.label.contains(c));
    let next_consistent = next.label.first().is_some_and(|c| cur.label.contains(c));

    if (prev_reliable && !next_reliable && prev_consistent)
        || (next_reliable && !prev_reliable && next_consistent)
    {
        CorrectionRule::OneSidedEvidence
    } else {
        CorrectionRule::Inconclusive
    }
}
