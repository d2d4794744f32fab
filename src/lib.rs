//! Rank-date forecasting for qualified beatmap sets.
//!
//! The platform ranks qualified sets in batches on a fixed wall-clock grid,
//! under daily and per-batch caps, with randomized inter-map delays and
//! queue-time penalties for prior disqualifications. This crate replays
//! each set's moderation history to find its effective queue date, then
//! simulates the interleaved per-mode queues to project when each set will
//! rank and how likely it is to rank before its interval boundary.

pub mod api;
pub mod args;
pub mod database;
pub mod model;
pub mod utils;
