//! Replays a beatmap set's moderation event history to derive the
//! effective queue date: the instant its 7-day holding clock started, after
//! queue-duration credit and disqualification penalties.

use crate::model::{
    constants::{DAY, MAXIMUM_PENALTY_DAYS, MINIMUM_DAYS_FOR_RANK},
    structures::map_event::{MapEvent, MapEventType}
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("set {beatmapset_id} is qualified but its event log holds no qualify event")]
    Inconsistent { beatmapset_id: i64 }
}

/// Walks the set's event history in chronological order and returns the
/// effective queue date: the derived queue entry instant plus the mandatory
/// holding period.
///
/// A requalification carries the previous queue duration back as credit
/// (capped one day short of the holding period) unless the nominator set
/// changed or the mapset gained a beatmap since the disqualification, and
/// is pushed later by one penalty day per full seven days spent
/// disqualified, up to [`MAXIMUM_PENALTY_DAYS`].
pub fn derive_queue_date(events: &[MapEvent], current_beatmap_ids: &[i64]) -> Result<DateTime<Utc>, EventLogError> {
    let mut queued_at: Option<DateTime<Utc>> = None;
    let mut previous_queue_duration = Duration::zero();
    let mut last_disqualified: Option<&MapEvent> = None;
    let mut nominators: Vec<i64> = Vec::new();

    for event in events {
        match event.kind {
            MapEventType::Qualify => {
                queued_at = Some(event.created_at);

                if let Some(disqualify) = last_disqualified {
                    if !same_nominators(&nominators, &disqualify.nominators) {
                        // Different nominating team, no credit transfer
                        previous_queue_duration = Duration::zero();
                    }

                    let mapset_changed = current_beatmap_ids
                        .iter()
                        .any(|id| !disqualify.beatmap_ids.contains(id));

                    if !mapset_changed {
                        let credit = previous_queue_duration
                            .min(Duration::seconds((MINIMUM_DAYS_FOR_RANK - 1) * DAY));
                        let penalty_days = penalty_days(event.created_at, disqualify.created_at);

                        queued_at =
                            Some(event.created_at - credit + Duration::seconds(penalty_days * DAY));
                    }
                }
            }
            MapEventType::Disqualify => {
                if let Some(at) = queued_at {
                    previous_queue_duration = event.created_at - at;
                }
                last_disqualified = Some(event);
                nominators.clear();
            }
            MapEventType::Rank => {
                previous_queue_duration = Duration::zero();
                queued_at = None;
            }
            MapEventType::Nominate => {
                if let Some(user_id) = event.user_id {
                    nominators.push(user_id);
                }
            }
            MapEventType::NominationReset => {
                nominators.clear();
            }
        }
    }

    match queued_at {
        Some(at) => Ok(at + Duration::seconds(MINIMUM_DAYS_FOR_RANK * DAY)),
        None => Err(EventLogError::Inconsistent {
            beatmapset_id: events.first().map(|e| e.beatmapset_id).unwrap_or_default()
        })
    }
}

/// One penalty day per full week spent disqualified, capped
fn penalty_days(requalified_at: DateTime<Utc>, disqualified_at: DateTime<Utc>) -> i64 {
    let elapsed = (requalified_at - disqualified_at).num_seconds();

    (elapsed / (7 * DAY)).min(MAXIMUM_PENALTY_DAYS)
}

fn same_nominators(current: &[i64], at_disqualify: &[i64]) -> bool {
    let current: BTreeSet<i64> = current.iter().copied().collect();
    let previous: BTreeSet<i64> = at_disqualify.iter().copied().collect();

    current == previous
}

#[cfg(test)]
mod tests {
    use super::{derive_queue_date, EventLogError};
    use crate::{
        model::{
            constants::DAY,
            structures::map_event::{MapEvent, MapEventType}
        },
        utils::test_utils::{generate_event, utc}
    };
    use chrono::Duration;

    fn days(n: i64) -> Duration {
        Duration::seconds(n * DAY)
    }

    #[test]
    fn test_single_qualify() {
        let t0 = utc("2024-03-01T12:00:00Z");
        let events = vec![generate_event(1, MapEventType::Qualify, 100, t0)];

        let queue_date = derive_queue_date(&events, &[11, 12]).unwrap();

        assert_eq!(queue_date, t0 + days(7));
    }

    #[test]
    fn test_requalify_same_nominators_and_beatmaps() {
        // Queued 3 days before the disqualify, requalified 10 days later:
        // 3 days of credit come back, 1 penalty day is assessed
        let qualify = utc("2024-03-01T00:00:00Z");
        let disqualify = qualify + days(3);
        let requalify = disqualify + days(10);

        let events = vec![
            MapEvent {
                user_id: Some(7),
                ..generate_event(1, MapEventType::Nominate, 100, qualify - days(1))
            },
            generate_event(2, MapEventType::Qualify, 100, qualify),
            MapEvent {
                beatmap_ids: vec![11, 12],
                nominators: vec![7],
                ..generate_event(3, MapEventType::Disqualify, 100, disqualify)
            },
            MapEvent {
                user_id: Some(7),
                ..generate_event(4, MapEventType::Nominate, 100, requalify - days(1))
            },
            generate_event(5, MapEventType::Qualify, 100, requalify),
        ];

        let queue_date = derive_queue_date(&events, &[11, 12]).unwrap();

        // queued_at = requalify - 3d + 1d, queue date adds the 7-day hold
        assert_eq!(queue_date, requalify + days(5));
    }

    #[test]
    fn test_requalify_different_nominators_discards_credit() {
        let qualify = utc("2024-03-01T00:00:00Z");
        let disqualify = qualify + days(3);
        let requalify = disqualify + days(10);

        let events = vec![
            MapEvent {
                user_id: Some(7),
                ..generate_event(1, MapEventType::Nominate, 100, qualify - days(1))
            },
            generate_event(2, MapEventType::Qualify, 100, qualify),
            MapEvent {
                beatmap_ids: vec![11, 12],
                nominators: vec![7],
                ..generate_event(3, MapEventType::Disqualify, 100, disqualify)
            },
            MapEvent {
                user_id: Some(8),
                ..generate_event(4, MapEventType::Nominate, 100, requalify - days(1))
            },
            generate_event(5, MapEventType::Qualify, 100, requalify),
        ];

        let queue_date = derive_queue_date(&events, &[11, 12]).unwrap();

        // Credit discarded, penalty still applied
        assert_eq!(queue_date, requalify + days(7) + days(1));
    }

    #[test]
    fn test_requalify_after_adding_beatmap_resets_clock() {
        let qualify = utc("2024-03-01T00:00:00Z");
        let disqualify = qualify + days(3);
        let requalify = disqualify + days(10);

        let events = vec![
            MapEvent {
                user_id: Some(7),
                ..generate_event(1, MapEventType::Nominate, 100, qualify - days(1))
            },
            generate_event(2, MapEventType::Qualify, 100, qualify),
            MapEvent {
                beatmap_ids: vec![11, 12],
                nominators: vec![7],
                ..generate_event(3, MapEventType::Disqualify, 100, disqualify)
            },
            MapEvent {
                user_id: Some(7),
                ..generate_event(4, MapEventType::Nominate, 100, requalify - days(1))
            },
            generate_event(5, MapEventType::Qualify, 100, requalify),
        ];

        // Beatmap 13 was added after the disqualify snapshot: no credit,
        // no penalty
        let queue_date = derive_queue_date(&events, &[11, 12, 13]).unwrap();

        assert_eq!(queue_date, requalify + days(7));
    }

    #[test]
    fn test_nomination_reset_clears_nominators() {
        let qualify = utc("2024-03-01T00:00:00Z");
        let disqualify = qualify + days(2);
        let requalify = disqualify + days(3);

        let events = vec![
            MapEvent {
                user_id: Some(7),
                ..generate_event(1, MapEventType::Nominate, 100, qualify - days(1))
            },
            generate_event(2, MapEventType::Qualify, 100, qualify),
            MapEvent {
                beatmap_ids: vec![11],
                nominators: vec![7],
                ..generate_event(3, MapEventType::Disqualify, 100, disqualify)
            },
            MapEvent {
                user_id: Some(7),
                ..generate_event(4, MapEventType::Nominate, 100, disqualify + days(1))
            },
            generate_event(5, MapEventType::NominationReset, 100, disqualify + days(2)),
            MapEvent {
                user_id: Some(7),
                ..generate_event(6, MapEventType::Nominate, 100, requalify - Duration::hours(1))
            },
            generate_event(7, MapEventType::Qualify, 100, requalify),
        ];

        // The reset wiped the accumulated list but the same nominator
        // renominated, so the sets still match and credit carries
        let queue_date = derive_queue_date(&events, &[11]).unwrap();

        assert_eq!(queue_date, requalify - days(2) + days(7));
    }

    #[test]
    fn test_rank_clears_queue_state() {
        let t0 = utc("2024-03-01T00:00:00Z");
        let events = vec![
            generate_event(1, MapEventType::Qualify, 100, t0),
            generate_event(2, MapEventType::Rank, 100, t0 + days(7)),
        ];

        let result = derive_queue_date(&events, &[11]);

        assert!(matches!(
            result,
            Err(EventLogError::Inconsistent { beatmapset_id: 100 })
        ));
    }

    #[test]
    fn test_empty_log_is_inconsistent() {
        let result = derive_queue_date(&[], &[11]);

        assert!(matches!(result, Err(EventLogError::Inconsistent { .. })));
    }

    #[test]
    fn test_penalty_capped() {
        let qualify = utc("2024-01-01T00:00:00Z");
        let disqualify = qualify + days(1);
        // 20 full weeks disqualified would mean 20 penalty days uncapped
        let requalify = disqualify + days(140);

        let events = vec![
            MapEvent {
                user_id: Some(7),
                ..generate_event(1, MapEventType::Nominate, 100, qualify - days(1))
            },
            generate_event(2, MapEventType::Qualify, 100, qualify),
            MapEvent {
                beatmap_ids: vec![11],
                nominators: vec![7],
                ..generate_event(3, MapEventType::Disqualify, 100, disqualify)
            },
            MapEvent {
                user_id: Some(7),
                ..generate_event(4, MapEventType::Nominate, 100, requalify - days(1))
            },
            generate_event(5, MapEventType::Qualify, 100, requalify),
        ];

        let queue_date = derive_queue_date(&events, &[11]).unwrap();

        // 1 day of credit, 14 penalty days (capped from 20)
        assert_eq!(queue_date, requalify - days(1) + days(14) + days(7));
    }
}
