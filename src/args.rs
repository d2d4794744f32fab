use clap::Parser;

#[derive(Parser, Clone)]
#[command(
    display_name = "Rank Forecaster",
    long_about = "Projects rank dates and early-rank probabilities for qualified beatmap sets"
)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "RUST_LOG",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        help = "Sets the logging verbosity"
    )]
    pub log_level: String,

    /// OAuth client id for the platform API
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret for the platform API
    #[arg(long, env = "CLIENT_SECRET")]
    pub client_secret: String,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Platform root URL; the v2 API and token endpoints hang off it
    #[arg(long, env = "API_ROOT", default_value = "https://osu.ppy.sh")]
    pub api_root: String,

    /// Newest global event id seen by the previous cycle. Zero bootstraps
    /// from the first event page.
    #[arg(long, env = "LAST_EVENT_ID", default_value_t = 0)]
    pub last_event_id: i64
}
