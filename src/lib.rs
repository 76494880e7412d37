pub mod broadcast;
pub mod cards;
pub mod config;
pub mod connection;
pub mod error;
pub mod hand;
pub mod hub;
pub mod protocol;
pub mod session;
pub mod table;

/// Chip amounts. Signed so settlement arithmetic (odd-chip remainders,
/// stack deltas) never needs a checked-subtraction dance.
pub type Chips = i64;

/// Seats at any one table. Fixed at compile time — spec's table shape is a
/// single ring of at most six, not a configurable parameter.
pub const MAX_SEATS: usize = 6;

/// Initializes process-wide logging from `RUST_LOG`, falling back to
/// `default_level` (normally `Config::log_level`). Replaces the teacher's
/// `simplelog`-to-file setup, which exists for the trainer's long unattended
/// runs; this server logs to stdout for the duration of one process.
pub fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Spawns the ctrl-c listener that tells every table to drain and exit
/// (spec §5's graceful shutdown: in-flight hands are allowed to finish
/// naturally, the process then exits once each table's loop has drained).
pub fn spawn_shutdown_listener(hub: std::sync::Arc<crate::hub::Hub>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        log::warn!("shutdown requested, draining tables");
        hub.shutdown().await;
        std::process::exit(0);
    });
}
