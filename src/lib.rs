pub mod advisor;
pub mod captaincy;
pub mod config;
pub mod consensus;
pub mod ffs_fetch;
pub mod fpl_fetch;
pub mod http_cache;
pub mod http_client;
pub mod model;
pub mod name_match;
pub mod player_score;
pub mod roster;
pub mod scout_fetch;
pub mod signal_fetch;
pub mod transfers;

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,fpl_advisor=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
