use crate::{
    database::db_structs::{Beatmap, BeatmapSet, ModeMaps},
    model::{
        constants::{DAY, HOUR},
        structures::game_mode::GameMode
    },
    utils::progress_utils::progress_bar
};
use chrono::{DateTime, TimeZone, Utc};
use postgres_types::ToSql;
use thiserror::Error;
use tokio_postgres::{Client, NoTls, Row};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database snapshot unavailable: {0}")]
    MissingSnapshot(tokio_postgres::Error),

    #[error("database write failed: {0}")]
    WriteFailed(tokio_postgres::Error),

    #[error("stored beatmap json is invalid for set {beatmapset_id}: {source}")]
    CorruptRow {
        beatmapset_id: i64,
        source: serde_json::Error
    }
}

const SELECT_COLUMNS: &str = "id, queue_date, rank_date, rank_date_early, artist, title, \
                              mapper, mapper_id, probability, unresolved, beatmaps";

pub struct DbClient {
    client: Client
}

impl DbClient {
    /// Connects and spawns the connection driver in the background
    pub async fn connect(connection_str: &str) -> Result<Self, DbError> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls)
            .await
            .map_err(DbError::MissingSnapshot)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("database connection error: {}", e);
            }
        });

        Ok(DbClient { client })
    }

    /// Loads the qualified pool, partitioned by mode and ordered by queue
    /// date ascending within each mode
    pub async fn get_qualified_maps(&self) -> Result<ModeMaps, DbError> {
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {} FROM beatmapsets WHERE queue_date IS NOT NULL ORDER BY queue_date",
                    SELECT_COLUMNS
                ),
                &[]
            )
            .await
            .map_err(DbError::MissingSnapshot)?;

        Self::partition(rows)
    }

    /// Loads the recently ranked tail used as scheduling context, ordered
    /// by rank date ascending within each mode
    pub async fn get_ranked_maps(&self) -> Result<ModeMaps, DbError> {
        let cutoff = Utc::now().timestamp() - DAY - HOUR;

        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {} FROM beatmapsets \
                     WHERE queue_date IS NULL AND rank_date > $1 ORDER BY rank_date",
                    SELECT_COLUMNS
                ),
                &[&cutoff]
            )
            .await
            .map_err(DbError::MissingSnapshot)?;

        Self::partition(rows)
    }

    fn partition(rows: Vec<Row>) -> Result<ModeMaps, DbError> {
        let mut maps = ModeMaps::new();
        for row in rows {
            maps.push(Self::set_from_row(&row)?);
        }

        Ok(maps)
    }

    fn set_from_row(row: &Row) -> Result<BeatmapSet, DbError> {
        let id: i64 = row.get("id");

        let beatmaps: Vec<Beatmap> = serde_json::from_str(row.get::<_, &str>("beatmaps"))
            .map_err(|source| DbError::CorruptRow {
                beatmapset_id: id,
                source
            })?;
        let mode = beatmaps.iter().map(|b| b.mode).min().unwrap_or(GameMode::Osu);

        Ok(BeatmapSet {
            id,
            artist: row.get("artist"),
            title: row.get("title"),
            mapper: row.get("mapper"),
            mapper_id: row.get("mapper_id"),
            mode,
            beatmaps,
            queue_date: from_epoch(row.get("queue_date")),
            rank_date: from_epoch(Some(row.get("rank_date"))),
            rank_date_early: from_epoch(row.get("rank_date_early")),
            probability: row.get("probability"),
            unresolved: row.get("unresolved")
        })
    }

    /// Applies one cycle's update set inside a single transaction: upserts
    /// for changed sets, deletes for sets that left the pool without
    /// ranking. Either everything lands or nothing does.
    pub async fn apply_updates(&mut self, maps: &[&BeatmapSet], deleted_ids: &[i64]) -> Result<(), DbError> {
        let transaction = self.client.transaction().await.map_err(DbError::WriteFailed)?;

        let statement = transaction
            .prepare(
                "INSERT INTO beatmapsets (id, queue_date, rank_date, rank_date_early, \
                 artist, title, mapper, mapper_id, probability, unresolved, beatmaps) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                 ON CONFLICT (id) DO UPDATE SET \
                 queue_date = EXCLUDED.queue_date, rank_date = EXCLUDED.rank_date, \
                 rank_date_early = EXCLUDED.rank_date_early, probability = EXCLUDED.probability, \
                 unresolved = EXCLUDED.unresolved, beatmaps = EXCLUDED.beatmaps"
            )
            .await
            .map_err(DbError::WriteFailed)?;

        let bar = progress_bar(maps.len() as u64, "Saving beatmap sets".to_string());

        for set in maps {
            let Some(rank_date) = set.rank_date else {
                log::warn!("set {} has no rank date assigned, not persisting", set.id);
                continue;
            };

            let beatmaps_json = serde_json::to_string(&set.beatmaps).unwrap_or_else(|_| "[]".to_string());
            let queue_date = set.queue_date.map(|d| d.timestamp());
            let rank_date = rank_date.timestamp();
            let rank_date_early = set.rank_date_early.map(|d| d.timestamp());

            let params: [&(dyn ToSql + Sync); 11] = [
                &set.id,
                &queue_date,
                &rank_date,
                &rank_date_early,
                &set.artist,
                &set.title,
                &set.mapper,
                &set.mapper_id,
                &set.probability,
                &set.unresolved,
                &beatmaps_json
            ];

            transaction
                .execute(&statement, &params)
                .await
                .map_err(DbError::WriteFailed)?;

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if !deleted_ids.is_empty() {
            transaction
                .execute("DELETE FROM beatmapsets WHERE id = ANY($1)", &[&deleted_ids])
                .await
                .map_err(DbError::WriteFailed)?;
        }

        transaction.commit().await.map_err(DbError::WriteFailed)?;

        if let Some(bar) = &bar {
            bar.finish();
        }

        Ok(())
    }

    /// Drops ranked-tail rows that aged out of the scheduling window
    pub async fn prune_ranked_tail(&mut self) -> Result<u64, DbError> {
        let cutoff = Utc::now().timestamp() - DAY - HOUR;

        self.client
            .execute(
                "DELETE FROM beatmapsets WHERE queue_date IS NULL AND rank_date <= $1",
                &[&cutoff]
            )
            .await
            .map_err(DbError::WriteFailed)
    }
}

fn from_epoch(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

/// Truncation applied before probabilities are compared, mirroring how they
/// are rendered downstream
fn truncate_probability(p: f64) -> f64 {
    (p * 100_000.0).floor() / 100_000.0
}

/// The sets whose persisted fields changed since the previous snapshot,
/// including sets the snapshot has never seen
pub fn updated_maps<'a>(previous: &ModeMaps, current: &'a ModeMaps) -> Vec<&'a BeatmapSet> {
    current
        .iter_all()
        .filter(|set| match previous.find(set.id) {
            None => true,
            Some(before) => {
                before.queue_date != set.queue_date
                    || before.rank_date != set.rank_date
                    || before.rank_date_early != set.rank_date_early
                    || before.unresolved != set.unresolved
                    || !same_probability(before.probability, set.probability)
                    || before.beatmaps != set.beatmaps
            }
        })
        .collect()
}

fn same_probability(before: Option<f64>, after: Option<f64>) -> bool {
    match (before, after) {
        (None, None) => true,
        (Some(a), Some(b)) => truncate_probability(a) == truncate_probability(b),
        _ => false
    }
}
