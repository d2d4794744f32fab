use crate::{
    database::db_structs::{Beatmap, BeatmapSet},
    model::structures::{
        game_mode::GameMode,
        map_event::{MapEvent, MapEventType}
    }
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OAuthResponse {
    pub access_token: String,

    /// Expire time in seconds
    pub expires_in: i64
}

#[derive(Debug, Deserialize)]
pub struct BeatmapsetPayload {
    pub id: i64,
    pub artist: String,
    pub title: String,
    pub creator: String,
    pub user_id: i64,
    pub ranked_date: Option<DateTime<Utc>>,
    pub status: String,
    pub beatmaps: Vec<BeatmapPayload>
}

#[derive(Debug, Deserialize)]
pub struct BeatmapPayload {
    pub id: i64,
    pub version: String,
    pub count_spinners: i32,
    pub difficulty_rating: f64,
    pub total_length: i32,
    pub mode_int: i32
}

#[derive(Debug, Deserialize)]
pub struct EventsPayload {
    pub events: Vec<EventPayload>
}

#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: MapEventType,
    pub created_at: DateTime<Utc>,
    pub beatmapset: Option<BeatmapsetRef>,
    pub discussion: Option<DiscussionRef>,
    pub user_id: Option<i64>,
    pub comment: Option<EventComment>
}

#[derive(Debug, Deserialize)]
pub struct BeatmapsetRef {
    pub id: i64
}

#[derive(Debug, Deserialize)]
pub struct DiscussionRef {
    pub beatmapset_id: i64
}

#[derive(Debug, Deserialize, Default)]
pub struct EventComment {
    #[serde(default)]
    pub beatmap_ids: Vec<i64>,
    #[serde(default)]
    pub nominator_ids: Vec<i64>
}

#[derive(Debug, Deserialize)]
pub struct DiscussionsPayload {
    pub beatmapsets: Vec<BeatmapsetRef>
}

impl EventPayload {
    /// The owning set's id, taken from the event itself or its discussion
    pub fn beatmapset_id(&self) -> Option<i64> {
        self.beatmapset
            .as_ref()
            .map(|set| set.id)
            .or_else(|| self.discussion.as_ref().map(|d| d.beatmapset_id))
    }

    /// Flattens the wire payload into the internal event form. Events with
    /// no resolvable set id are dropped by the caller.
    pub fn into_map_event(self) -> Option<MapEvent> {
        let beatmapset_id = self.beatmapset_id()?;
        let comment = self.comment.unwrap_or_default();

        Some(MapEvent {
            id: self.id,
            beatmapset_id,
            kind: self.kind,
            created_at: self.created_at,
            beatmap_ids: comment.beatmap_ids,
            nominators: comment.nominator_ids,
            user_id: self.user_id
        })
    }
}

impl From<BeatmapsetPayload> for BeatmapSet {
    fn from(payload: BeatmapsetPayload) -> BeatmapSet {
        let mut beatmaps: Vec<Beatmap> = payload
            .beatmaps
            .into_iter()
            .map(|b| Beatmap {
                id: b.id,
                version: b.version,
                spinner_count: b.count_spinners,
                star_rating: b.difficulty_rating,
                length_seconds: b.total_length,
                mode: GameMode::try_from(b.mode_int).unwrap_or(GameMode::Osu)
            })
            .collect();

        beatmaps.sort_by(|a, b| a.star_rating.total_cmp(&b.star_rating));

        let mode = beatmaps.iter().map(|b| b.mode).min().unwrap_or(GameMode::Osu);

        BeatmapSet {
            id: payload.id,
            artist: payload.artist,
            title: payload.title,
            mapper: payload.creator,
            mapper_id: payload.user_id,
            mode,
            beatmaps,
            queue_date: None,
            rank_date: payload.ranked_date,
            rank_date_early: None,
            probability: None,
            unresolved: false
        }
    }
}
