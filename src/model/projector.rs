//! Assigns each qualified set its earliest possible rank moment, its
//! interval-aligned scheduled rank time, and the probability of ranking at
//! the early moment, honoring the daily and per-batch caps.

use crate::{
    database::db_structs::{BeatmapSet, ModeMaps},
    model::{
        constants::{DAY, RANK_INTERVAL_MINUTES, RANK_INTERVAL_MS, RANK_PER_DAY, RANK_PER_RUN, SPLIT},
        probability::probability_after,
        structures::game_mode::GameMode
    }
};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use indexmap::IndexMap;

/// Rounds up to the next rank interval boundary (UTC)
pub fn ceil_to_interval(instant: DateTime<Utc>) -> DateTime<Utc> {
    let millis = instant.timestamp_millis();
    let d = millis / RANK_INTERVAL_MS;
    let r = millis % RANK_INTERVAL_MS;
    let div_ceil = if (r > 0 && RANK_INTERVAL_MS > 0) || (r < 0 && RANK_INTERVAL_MS < 0) {
        d + 1
    } else {
        d
    };
    let rounded = div_ceil * RANK_INTERVAL_MS;

    Utc.timestamp_millis_opt(rounded).unwrap()
}

/// Rounds down to the previous rank interval boundary (UTC)
pub fn floor_to_interval(instant: DateTime<Utc>) -> DateTime<Utc> {
    let millis = instant.timestamp_millis();
    let rounded = millis.div_euclid(RANK_INTERVAL_MS) * RANK_INTERVAL_MS;

    Utc.timestamp_millis_opt(rounded).unwrap()
}

/// Seconds between `instant` and the interval boundary preceding it
pub fn interval_time_delta(instant: DateTime<Utc>) -> f64 {
    ((instant.minute() as i64 % RANK_INTERVAL_MINUTES) * 60 + instant.second() as i64) as f64
}

/// Scheduling fields of an already-assigned predecessor, copied out so the
/// current entry can be mutated freely
#[derive(Clone, Copy)]
struct PriorEntry {
    queue_date: Option<DateTime<Utc>>,
    rank_date: Option<DateTime<Utc>>,
    unresolved: bool
}

impl PriorEntry {
    /// Entry `idx` of the combined `ranked ++ qualified` sequence
    fn at(ranked: &[BeatmapSet], qualified: &[BeatmapSet], idx: usize) -> PriorEntry {
        let set = if idx < ranked.len() {
            &ranked[idx]
        } else {
            &qualified[idx - ranked.len()]
        };

        PriorEntry {
            queue_date: set.queue_date,
            rank_date: set.rank_date,
            unresolved: set.unresolved
        }
    }
}

/// Projects rank dates for one mode's queue.
///
/// `qualified` must be ordered by queue date ascending and `ranked` by rank
/// date ascending; entries before `start` are assumed already assigned.
/// Each entry's assignment depends on its predecessors in the combined
/// `ranked ++ qualified` sequence, so iteration is strictly left to right.
pub fn adjust_rank_dates(qualified: &mut [BeatmapSet], ranked: &[BeatmapSet], start: usize) {
    let ranked_len = ranked.len();
    let total = ranked_len + qualified.len();

    for i in (ranked_len + start)..total {
        let qi = i - ranked_len;

        let Some(queue_date) = qualified[qi].queue_date else {
            continue;
        };

        // Daily cap: the RANK_PER_DAY-th most recent resolved predecessor
        // pins the earliest moment this entry can take
        let mut compare_date: Option<DateTime<Utc>> = None;
        let mut seen = 0usize;
        for j in (0..i).rev() {
            let prior = PriorEntry::at(ranked, qualified, j);
            if prior.unresolved {
                continue;
            }
            seen += 1;
            if seen == RANK_PER_DAY {
                if let Some(rank_date) = prior.rank_date {
                    let mut candidate = rank_date + Duration::seconds(DAY);
                    if i >= ranked_len + RANK_PER_DAY {
                        // Cap window sits fully inside qualified territory,
                        // where interval-level resolution applies
                        candidate += Duration::minutes(RANK_INTERVAL_MINUTES);
                    }
                    compare_date = Some(candidate);
                }
                break;
            }
        }

        let early = compare_date.map_or(queue_date, |cd| queue_date.max(cd));
        qualified[qi].rank_date_early = Some(early);

        let fine_window = compare_date.map_or(true, |cd| queue_date > cd) || i < ranked_len + RANK_PER_DAY;
        qualified[qi].probability = if fine_window {
            Some(probability_after(interval_time_delta(early), None))
        } else {
            // Coarse path: the early moment sits on the cap boundary itself
            None
        };

        qualified[qi].rank_date = Some(ceil_to_interval(early));

        // Per-batch cap against the most recent resolved predecessors
        if i >= RANK_PER_RUN && !qualified[qi].unresolved {
            let filtered: Vec<PriorEntry> = {
                let snapshot: &[BeatmapSet] = qualified;
                (0..i)
                    .rev()
                    .map(|j| PriorEntry::at(ranked, snapshot, j))
                    .filter(|prior| !prior.unresolved)
                    .collect()
            };

            if let Some(prior) = filtered.first() {
                if let (Some(_), Some(prior_rank_date)) = (prior.queue_date, prior.rank_date) {
                    let prior_floor = floor_to_interval(prior_rank_date);
                    if qualified[qi].rank_date.is_some_and(|rd| rd < prior_floor) {
                        qualified[qi].rank_date = Some(prior_floor);
                        qualified[qi].rank_date_early = Some(prior_floor);
                        qualified[qi].probability = Some(0.0);
                    }
                }
            }

            if filtered.len() >= RANK_PER_RUN {
                let window = &filtered[..RANK_PER_RUN];
                let early_floor = qualified[qi].rank_date_early.map(floor_to_interval);

                let slot_saturated = early_floor.is_some_and(|ef| {
                    window
                        .iter()
                        .all(|p| p.rank_date.is_some_and(|rd| floor_to_interval(rd) >= ef))
                });

                if slot_saturated {
                    let floors: Vec<DateTime<Utc>> = window
                        .iter()
                        .filter_map(|p| p.rank_date.map(floor_to_interval))
                        .collect();
                    let whole_slot_shared = floors.iter().all(|f| *f == floors[RANK_PER_RUN - 1]);

                    let pushed = if whole_slot_shared {
                        floors[0] + Duration::minutes(RANK_INTERVAL_MINUTES)
                    } else {
                        floors[0]
                    };

                    qualified[qi].rank_date = Some(pushed);
                    qualified[qi].rank_date_early = Some(pushed);
                    qualified[qi].probability = Some(0.0);
                }
            }
        }
    }
}

/// Re-estimates early-rank probabilities across modes.
///
/// Every qualified map is counted into an interval bucket (its early
/// interval when likely to rank early, its scheduled one otherwise); each
/// map whose early and scheduled times differ is then re-evaluated against
/// the other modes' counts in its early interval. Approximate when several
/// modes share a boundary.
pub fn calc_early_probability(qualified: &mut ModeMaps) {
    let mut rank_dates: IndexMap<i64, [u32; 4]> = IndexMap::new();

    for mode in GameMode::ALL {
        for set in qualified.get(mode) {
            let likely_early = set.probability.is_some_and(|p| p > SPLIT);
            let key = if likely_early {
                set.rank_date_early.map(floor_to_interval)
            } else {
                set.rank_date
            };

            if let Some(key) = key {
                rank_dates.entry(key.timestamp_millis()).or_insert([0; 4])[mode.index()] += 1;
            }
        }
    }

    for mode in GameMode::ALL {
        for set in qualified.get_mut(mode) {
            let (Some(_), Some(early), Some(rank_date)) = (set.probability, set.rank_date_early, set.rank_date)
            else {
                continue;
            };
            if early == rank_date {
                continue;
            }

            let counts = rank_dates
                .get(&floor_to_interval(early).timestamp_millis())
                .copied()
                .unwrap_or_default();
            let other_modes: Vec<u32> = (0..4)
                .filter(|&m| m != mode.index())
                .map(|m| counts[m])
                .collect();

            set.probability = Some(probability_after(interval_time_delta(early), Some(&other_modes)));
        }
    }
}

/// Projects every mode's queue, then runs the cross-mode re-estimation
pub fn adjust_all_rank_dates(qualified: &mut ModeMaps, ranked: &ModeMaps) {
    for mode in GameMode::ALL {
        adjust_rank_dates(qualified.get_mut(mode), ranked.get(mode), 0);
    }

    calc_early_probability(qualified);
}

#[cfg(test)]
mod tests {
    use super::{adjust_rank_dates, calc_early_probability, ceil_to_interval, floor_to_interval, interval_time_delta};
    use crate::{
        database::db_structs::ModeMaps,
        model::{
            constants::{DAY, RANK_INTERVAL_MINUTES, RANK_INTERVAL_MS, RANK_PER_DAY, RANK_PER_RUN},
            structures::game_mode::GameMode
        },
        utils::test_utils::{generate_qualified_set, generate_ranked_set, utc}
    };
    use chrono::Duration;

    #[test]
    fn test_interval_rounding() {
        let inside = utc("2024-03-01T12:07:31Z");

        assert_eq!(ceil_to_interval(inside), utc("2024-03-01T12:20:00Z"));
        assert_eq!(floor_to_interval(inside), utc("2024-03-01T12:00:00Z"));

        let boundary = utc("2024-03-01T12:40:00Z");
        assert_eq!(ceil_to_interval(boundary), boundary);
        assert_eq!(floor_to_interval(boundary), boundary);
    }

    #[test]
    fn test_interval_time_delta() {
        assert_eq!(interval_time_delta(utc("2024-03-01T12:00:00Z")), 0.0);
        assert_eq!(interval_time_delta(utc("2024-03-01T12:07:31Z")), 451.0);
        assert_eq!(interval_time_delta(utc("2024-03-01T12:27:31Z")), 451.0);
    }

    #[test]
    fn test_lone_map_ranks_at_queue_date() {
        let queue_date = utc("2024-03-08T09:05:00Z");
        let mut qualified = vec![generate_qualified_set(1, GameMode::Osu, queue_date)];

        adjust_rank_dates(&mut qualified, &[], 0);

        let set = &qualified[0];
        assert_eq!(set.rank_date_early, Some(queue_date));
        assert_eq!(set.rank_date, Some(utc("2024-03-08T09:20:00Z")));
        assert!(set.probability.is_some());
    }

    #[test]
    fn test_daily_cap_defers_ninth_map() {
        // Nine maps an hour apart: the ninth cannot rank within a day of
        // the first
        let t0 = utc("2024-03-08T00:05:00Z");
        let mut qualified: Vec<_> = (0..9)
            .map(|i| generate_qualified_set(i, GameMode::Osu, t0 + Duration::hours(i)))
            .collect();

        adjust_rank_dates(&mut qualified, &[], 0);

        let first_rank_date = qualified[0].rank_date.unwrap();
        let ninth = &qualified[8];

        assert!(ninth.rank_date.unwrap() >= first_rank_date + Duration::seconds(DAY));
        // Deferred past its own queue date
        assert!(ninth.rank_date.unwrap() > qualified[8].queue_date.unwrap());
    }

    #[test]
    fn test_daily_cap_ignored_when_queue_date_later() {
        // Maps spread days apart never hit the cap
        let t0 = utc("2024-03-08T00:05:00Z");
        let mut qualified: Vec<_> = (0..RANK_PER_DAY as i64 + 1)
            .map(|i| generate_qualified_set(i, GameMode::Osu, t0 + Duration::days(i)))
            .collect();

        adjust_rank_dates(&mut qualified, &[], 0);

        for set in &qualified {
            assert_eq!(set.rank_date, Some(ceil_to_interval(set.queue_date.unwrap())));
        }
    }

    #[test]
    fn test_ranked_tail_feeds_daily_cap() {
        let ranked_at = utc("2024-03-07T10:00:00Z");
        let ranked: Vec<_> = (0..RANK_PER_DAY as i64)
            .map(|i| generate_ranked_set(100 + i, GameMode::Osu, ranked_at + Duration::minutes(20 * i)))
            .collect();

        // Queue date inside the capped day
        let mut qualified = vec![generate_qualified_set(1, GameMode::Osu, ranked_at + Duration::hours(2))];

        adjust_rank_dates(&mut qualified, &ranked, 0);

        // Pinned a day past the oldest ranked entry in the window
        let expected_floor = ranked[0].rank_date.unwrap() + Duration::seconds(DAY);
        assert!(qualified[0].rank_date_early.unwrap() >= expected_floor);
    }

    #[test]
    fn test_per_run_overflow_pushes_to_next_interval() {
        let slot = utc("2024-03-08T12:00:00Z");

        // Three maps saturate the slot; their rank dates all floor to it
        let mut qualified: Vec<_> = (0..RANK_PER_RUN as i64)
            .map(|i| generate_qualified_set(i, GameMode::Osu, slot - Duration::minutes(15) + Duration::minutes(i)))
            .collect();
        qualified.push(generate_qualified_set(
            99,
            GameMode::Osu,
            slot - Duration::minutes(1)
        ));

        adjust_rank_dates(&mut qualified, &[], 0);

        for set in &qualified[..RANK_PER_RUN] {
            assert_eq!(set.rank_date, Some(slot));
        }

        let fourth = &qualified[RANK_PER_RUN];
        assert_eq!(
            fourth.rank_date,
            Some(slot + Duration::minutes(RANK_INTERVAL_MINUTES))
        );
        assert_eq!(fourth.rank_date_early, fourth.rank_date);
        assert_eq!(fourth.probability, Some(0.0));
    }

    #[test]
    fn test_unresolved_excluded_from_caps() {
        let slot = utc("2024-03-08T12:00:00Z");

        let mut qualified: Vec<_> = (0..RANK_PER_RUN as i64)
            .map(|i| generate_qualified_set(i, GameMode::Osu, slot - Duration::minutes(15) + Duration::minutes(i)))
            .collect();
        // One of the saturating maps is stuck on an unresolved discussion
        qualified[1].unresolved = true;
        qualified.push(generate_qualified_set(
            99,
            GameMode::Osu,
            slot - Duration::minutes(1)
        ));

        adjust_rank_dates(&mut qualified, &[], 0);

        // Only two resolved maps occupy the slot, so the newcomer fits
        let fourth = &qualified[RANK_PER_RUN];
        assert_eq!(fourth.rank_date, Some(slot));
    }

    #[test]
    fn test_rank_dates_never_precede_queue_dates() {
        let t0 = utc("2024-03-08T00:05:00Z");
        let mut qualified: Vec<_> = (0..12)
            .map(|i| generate_qualified_set(i, GameMode::Osu, t0 + Duration::minutes(90 * i)))
            .collect();

        adjust_rank_dates(&mut qualified, &[], 0);

        for set in &qualified {
            let queue_date = set.queue_date.unwrap();
            let early = set.rank_date_early.unwrap();
            let rank_date = set.rank_date.unwrap();

            assert!(queue_date <= early, "queue date after early time for {}", set.id);
            assert!(early <= rank_date, "early time after rank date for {}", set.id);
            assert_eq!(rank_date.timestamp_millis() % RANK_INTERVAL_MS, 0);
        }
    }

    #[test]
    fn test_cross_mode_reestimation_counts_other_modes() {
        let t0 = utc("2024-03-08T09:05:00Z");

        let mut qualified = ModeMaps::new();
        qualified.push(generate_qualified_set(1, GameMode::Osu, t0));
        qualified.push(generate_qualified_set(2, GameMode::Taiko, t0 + Duration::minutes(1)));
        qualified.push(generate_qualified_set(3, GameMode::Mania, t0 + Duration::minutes(2)));

        for mode in GameMode::ALL {
            adjust_rank_dates(qualified.get_mut(mode), &[], 0);
        }

        let solo_probability = qualified.get(GameMode::Osu)[0].probability;

        calc_early_probability(&mut qualified);

        let shared_probability = qualified.get(GameMode::Osu)[0].probability;

        // Two other modes now contribute to the same interval, lengthening
        // the batch delay and raising the early chance
        assert!(shared_probability >= solo_probability);
    }

    #[test]
    fn test_reestimation_skips_boundary_aligned_maps() {
        let boundary = utc("2024-03-08T09:20:00Z");

        let mut qualified = ModeMaps::new();
        qualified.push(generate_qualified_set(1, GameMode::Osu, boundary));

        adjust_rank_dates(qualified.get_mut(GameMode::Osu), &[], 0);

        let before = qualified.get(GameMode::Osu)[0].probability;
        calc_early_probability(&mut qualified);

        // Early and scheduled times coincide, nothing to re-estimate
        assert_eq!(qualified.get(GameMode::Osu)[0].probability, before);
    }
}
