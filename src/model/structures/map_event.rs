use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation event kinds consumed from the platform's event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapEventType {
    Qualify,
    Disqualify,
    Rank,
    Nominate,
    NominationReset
}

/// Internal form of a single moderation event, flattened from the wire
/// payload. `beatmap_ids` and `nominators` are populated from the event's
/// comment block when present.
#[derive(Debug, Clone)]
pub struct MapEvent {
    pub id: i64,
    pub beatmapset_id: i64,
    pub kind: MapEventType,
    pub created_at: DateTime<Utc>,
    pub beatmap_ids: Vec<i64>,
    pub nominators: Vec<i64>,
    pub user_id: Option<i64>
}
