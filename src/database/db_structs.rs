use crate::model::structures::game_mode::GameMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One difficulty within a beatmap set. Persisted as a JSON array on the
/// parent row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beatmap {
    pub id: i64,
    pub version: String,
    pub spinner_count: i32,
    pub star_rating: f64,
    pub length_seconds: i32,
    pub mode: GameMode
}

/// A beatmap set together with its mutable scheduling attributes.
///
/// `queue_date` is the effective start of the 7-day holding clock and is
/// null for already-ranked sets. `rank_date` is always rounded up to a rank
/// interval boundary; `rank_date_early` is the projected moment before
/// rounding. Absent instants stay `None` rather than sentinel zeros, since
/// epoch zero is a valid timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatmapSet {
    pub id: i64,
    pub artist: String,
    pub title: String,
    pub mapper: String,
    pub mapper_id: i64,
    /// The minimum mode across the set's beatmaps; the set queues there
    pub mode: GameMode,
    /// Sorted by star rating ascending
    pub beatmaps: Vec<Beatmap>,
    pub queue_date: Option<DateTime<Utc>>,
    pub rank_date: Option<DateTime<Utc>>,
    pub rank_date_early: Option<DateTime<Utc>>,
    pub probability: Option<f64>,
    /// Sets with outstanding unresolved discussions do not count toward
    /// queue caps
    pub unresolved: bool
}

impl BeatmapSet {
    pub fn beatmap_ids(&self) -> Vec<i64> {
        self.beatmaps.iter().map(|b| b.id).collect()
    }
}

/// The qualified (or ranked-tail) pool, partitioned by mode. Each mode's
/// sequence keeps its ordering invariant: queue date ascending for
/// qualified sets, rank date ascending for the ranked tail.
#[derive(Debug, Clone, Default)]
pub struct ModeMaps {
    maps: [Vec<BeatmapSet>; 4]
}

impl ModeMaps {
    pub fn new() -> ModeMaps {
        ModeMaps::default()
    }

    pub fn get(&self, mode: GameMode) -> &[BeatmapSet] {
        &self.maps[mode.index()]
    }

    pub fn get_mut(&mut self, mode: GameMode) -> &mut Vec<BeatmapSet> {
        &mut self.maps[mode.index()]
    }

    /// Routes the set into its mode's queue
    pub fn push(&mut self, set: BeatmapSet) {
        self.maps[set.mode.index()].push(set);
    }

    pub fn total(&self) -> usize {
        self.maps.iter().map(Vec::len).sum()
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &BeatmapSet> {
        self.maps.iter().flatten()
    }

    pub fn iter_all_mut(&mut self) -> impl Iterator<Item = &mut BeatmapSet> {
        self.maps.iter_mut().flatten()
    }

    pub fn find(&self, id: i64) -> Option<&BeatmapSet> {
        self.iter_all().find(|s| s.id == id)
    }

    pub fn find_mut(&mut self, id: i64) -> Option<&mut BeatmapSet> {
        self.iter_all_mut().find(|s| s.id == id)
    }

    /// Removes the set with the given id from whichever queue holds it
    pub fn remove(&mut self, id: i64) -> Option<BeatmapSet> {
        for queue in self.maps.iter_mut() {
            if let Some(pos) = queue.iter().position(|s| s.id == id) {
                return Some(queue.remove(pos));
            }
        }

        None
    }

    /// Restores queue-date ordering after insertions or requeues
    pub fn sort_by_queue_date(&mut self) {
        for queue in self.maps.iter_mut() {
            queue.sort_by_key(|s| s.queue_date);
        }
    }

    /// Restores rank-date ordering for the ranked tail
    pub fn sort_by_rank_date(&mut self) {
        for queue in self.maps.iter_mut() {
            queue.sort_by_key(|s| s.rank_date);
        }
    }
}
