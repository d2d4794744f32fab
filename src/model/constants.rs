/// Seconds per minute
pub const MINUTE: i64 = 60;

/// Seconds per hour
pub const HOUR: i64 = 3600;

/// Seconds per day
pub const DAY: i64 = 86_400;

/// Minutes between ranking batches on the wall-clock grid (UTC)
pub const RANK_INTERVAL_MINUTES: i64 = 20;

/// Rank interval expressed in milliseconds, the unit all engine time math
/// uses internally
pub const RANK_INTERVAL_MS: i64 = RANK_INTERVAL_MINUTES * MINUTE * 1000;

/// Maximum maps ranked per batch tick, per mode
pub const RANK_PER_RUN: usize = 3;

/// Maximum maps ranked per 24h window, per mode
pub const RANK_PER_DAY: usize = 8;

/// Mandatory holding period between qualification and ranking
pub const MINIMUM_DAYS_FOR_RANK: i64 = 7;

/// Upper bound on queue-time penalty days assessed after a disqualification
pub const MAXIMUM_PENALTY_DAYS: i64 = 14;

/// Smallest randomized delay (seconds) the scheduler inserts before a map
/// in a batch
pub const DELAY_MIN: f64 = 60.0;

/// Largest randomized delay (seconds) the scheduler inserts before a map
/// in a batch
pub const DELAY_MAX: f64 = 600.0;

/// Probability threshold deciding which interval bucket a map is counted
/// toward during cross-mode re-estimation
pub const SPLIT: f64 = 0.5;

/// Events requested per page from the global event stream
pub const EVENT_PAGE_LIMIT: u32 = 50;

/// Hard cap on pages walked per cycle. The walker normally stops at the
/// caller's cursor; if the platform deleted the cursor event the walk would
/// never terminate without this.
pub const MAX_EVENT_PAGES: u32 = 200;

/// Successful page fetches allowed before the walker pauses
pub const EVENT_PAGES_PER_WINDOW: u32 = 30;

/// Pause length (seconds) once a fetch window is exhausted
pub const EVENT_PAGE_COOLDOWN: u64 = 60;
