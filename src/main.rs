use clap::Parser;
use itertools::Itertools;
use rank_forecaster::{
    api::{ApiError, OsuApiClient},
    args::Args,
    database::{
        db::{updated_maps, DbClient, DbError},
        db_structs::{BeatmapSet, ModeMaps}
    },
    model::{event_log, projector, structures::map_event::MapEvent}
};
use thiserror::Error;

#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Db(#[from] DbError)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    match run_cycle(&args).await {
        Ok(next_cursor) => {
            log::info!("cycle complete, next event cursor: {}", next_cursor);
        }
        Err(e) => {
            log::error!("cycle aborted, nothing was written: {}", e);
            std::process::exit(1);
        }
    }
}

/// One refresh cycle: snapshot, event replay, projection, diffed write.
/// Returns the event cursor the next cycle should start from.
async fn run_cycle(args: &Args) -> Result<i64, CycleError> {
    let api = OsuApiClient::new(&args.api_root, &args.client_id, &args.client_secret)?;
    let mut db = DbClient::connect(&args.database_url).await?;

    let mut qualified = db.get_qualified_maps().await?;
    let mut ranked = db.get_ranked_maps().await?;
    log::info!(
        "loaded {} qualified sets and {} ranked-tail sets",
        qualified.total(),
        ranked.total()
    );

    // The diff baseline is the snapshot as stored, before any event is applied
    let previous = qualified.clone();

    let (events, next_cursor) = api.get_recent_events(args.last_event_id).await?;
    log::info!("{} new events since cursor {}", events.len(), args.last_event_id);

    let mut removed_ids = Vec::new();
    let mut newly_ranked = Vec::new();
    for set_id in affected_set_ids(&events) {
        refresh_set(
            &api,
            set_id,
            &mut qualified,
            &mut ranked,
            &mut removed_ids,
            &mut newly_ranked
        )
        .await?;
    }

    qualified.sort_by_queue_date();
    ranked.sort_by_rank_date();

    let unresolved_ids = api.get_unresolved_beatmapset_ids().await?;
    for set in qualified.iter_all_mut() {
        set.unresolved = unresolved_ids.contains(&set.id);
    }

    projector::adjust_all_rank_dates(&mut qualified, &ranked);

    let mut changed = updated_maps(&previous, &qualified);
    changed.extend(newly_ranked.iter().filter_map(|id| ranked.find(*id)));
    log::info!(
        "{} sets changed, {} removed from the pool",
        changed.len(),
        removed_ids.len()
    );

    db.apply_updates(&changed, &removed_ids).await?;
    let pruned = db.prune_ranked_tail().await?;
    if pruned > 0 {
        log::debug!("pruned {} aged-out ranked rows", pruned);
    }

    Ok(next_cursor)
}

/// Set ids touched by the new events, oldest occurrence first
fn affected_set_ids(events: &[MapEvent]) -> Vec<i64> {
    events.iter().map(|e| e.beatmapset_id).unique().collect()
}

/// Refetches one touched set and reconciles it with the in-memory pools.
///
/// A set whose event log cannot produce a queue date is logged and left
/// untouched; every other failure aborts the cycle.
async fn refresh_set(
    api: &OsuApiClient,
    set_id: i64,
    qualified: &mut ModeMaps,
    ranked: &mut ModeMaps,
    removed_ids: &mut Vec<i64>,
    newly_ranked: &mut Vec<i64>
) -> Result<(), CycleError> {
    let payload = api.get_beatmapset(set_id).await?;

    match payload.status.as_str() {
        "qualified" => {
            let mut set = BeatmapSet::from(payload);
            let history = api.get_beatmapset_events(set_id).await?;

            match event_log::derive_queue_date(&history, &set.beatmap_ids()) {
                Ok(queue_date) => {
                    set.queue_date = Some(queue_date);
                    qualified.remove(set_id);
                    qualified.push(set);
                }
                Err(e) => {
                    log::warn!("skipping set {}: {}", set_id, e);
                }
            }
        }
        "ranked" => {
            qualified.remove(set_id);

            let set = BeatmapSet::from(payload);
            if set.rank_date.is_some() {
                newly_ranked.push(set_id);
                ranked.remove(set_id);
                ranked.push(set);
            }
        }
        status => {
            // Disqualified or otherwise back to pending
            log::debug!("set {} left the queue with status {}", set_id, status);
            if qualified.remove(set_id).is_some() {
                removed_ids.push(set_id);
            }
        }
    }

    Ok(())
}
