use crate::{
    database::db_structs::{Beatmap, BeatmapSet},
    model::structures::{
        game_mode::GameMode,
        map_event::{MapEvent, MapEventType}
    }
};
use chrono::{DateTime, Utc};

pub fn utc(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse::<DateTime<Utc>>().unwrap()
}

pub fn generate_event(id: i64, kind: MapEventType, beatmapset_id: i64, created_at: DateTime<Utc>) -> MapEvent {
    MapEvent {
        id,
        beatmapset_id,
        kind,
        created_at,
        beatmap_ids: Vec::new(),
        nominators: Vec::new(),
        user_id: None
    }
}

pub fn generate_beatmap(id: i64, star_rating: f64, mode: GameMode) -> Beatmap {
    Beatmap {
        id,
        version: format!("Difficulty {}", id),
        spinner_count: 1,
        star_rating,
        length_seconds: 180,
        mode
    }
}

fn generate_set(id: i64, mode: GameMode) -> BeatmapSet {
    BeatmapSet {
        id,
        artist: "Test Artist".to_string(),
        title: format!("Test Title {}", id),
        mapper: "test mapper".to_string(),
        mapper_id: 1000 + id,
        mode,
        beatmaps: vec![
            generate_beatmap(id * 10, 2.5, mode),
            generate_beatmap(id * 10 + 1, 5.0, mode),
        ],
        queue_date: None,
        rank_date: None,
        rank_date_early: None,
        probability: None,
        unresolved: false
    }
}

/// A set sitting in the qualified queue, scheduling fields unassigned
pub fn generate_qualified_set(id: i64, mode: GameMode, queue_date: DateTime<Utc>) -> BeatmapSet {
    BeatmapSet {
        queue_date: Some(queue_date),
        ..generate_set(id, mode)
    }
}

/// A recently ranked set usable as scheduling context
pub fn generate_ranked_set(id: i64, mode: GameMode, rank_date: DateTime<Utc>) -> BeatmapSet {
    BeatmapSet {
        rank_date: Some(rank_date),
        ..generate_set(id, mode)
    }
}
