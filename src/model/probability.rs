//! Probability that a mode's next map ranks before a given offset past the
//! last interval boundary.
//!
//! A batch tick fires at the boundary plus one randomized delay per map
//! ahead in the cross-mode rank order. With `m` maps ahead (own queue
//! position plus contributions from other modes) the accumulated delay is a
//! sum of `m` uniforms on [DELAY_MIN, DELAY_MAX]; the map ranks at its early
//! moment exactly when that accumulated delay has not yet elapsed.

use crate::model::{
    constants::{DELAY_MAX, DELAY_MIN},
    distributions::uniform_sum_cdf
};
use itertools::Itertools;
use std::collections::HashMap;

/// Probability that this mode's next map ranks before `seconds` past the
/// last interval boundary, averaged over the four positions the mode can
/// occupy in the cross-mode rank order.
///
/// `other_mode_counts` lists how many maps each of the up-to-3 other modes
/// contributes to the same interval; absent counts mean the mode is treated
/// as alone in the batch.
///
/// Positions 1..4 are treated as equally likely, a simplifying assumption.
/// The result is truncated to 5 decimal places for stable comparison
/// against previously stored values.
pub fn probability_after(seconds: f64, other_mode_counts: Option<&[u32]>) -> f64 {
    // CDF terms depend only on the total count ahead, so they are shared
    // across positions within a single call.
    let mut memo: HashMap<u32, f64> = HashMap::new();

    let mut position_total = 0.0;
    for pos in 1..=4u32 {
        let perm_sums = perm_sums(pos, other_mode_counts);

        let mode_sum: f64 = perm_sums
            .iter()
            .map(|&s| {
                let m = pos + s;
                *memo.entry(m).or_insert_with(|| {
                    let scaled = (seconds - m as f64 * DELAY_MIN) / (DELAY_MAX - DELAY_MIN);
                    1.0 - uniform_sum_cdf(m, scaled)
                })
            })
            .sum::<f64>()
            / perm_sums.len() as f64;

        position_total += mode_sum;
    }

    (position_total / 4.0 * 100_000.0).floor() / 100_000.0
}

/// The distinct sums of `pos - 1` selections from the other modes' counts.
fn perm_sums(pos: u32, other_mode_counts: Option<&[u32]>) -> Vec<u32> {
    let counts = match other_mode_counts {
        Some(counts) if !counts.is_empty() => counts,
        _ => return vec![0]
    };

    let sums: Vec<u32> = match pos {
        1 => vec![0],
        2 => counts.to_vec(),
        3 => (0..counts.len())
            .cartesian_product(0..counts.len())
            .filter(|(a, b)| a != b)
            .map(|(a, b)| counts[a] + counts[b])
            .collect(),
        _ => vec![counts.iter().sum()]
    };

    if sums.is_empty() {
        // Fewer than two other modes leave no ordered pairs to enumerate
        vec![0]
    } else {
        sums
    }
}
