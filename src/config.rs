use crate::Chips;
use std::time::Duration;

/// Process-wide configuration, sourced from the environment at startup
/// following the teacher's `std::env::var(...).expect(...)`-then-default
/// convention (`hosting::Server::run` read `BIND_ADDR` the same way).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub log_level: String,
    pub num_tables: usize,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub starting_stack: Chips,
    /// Seconds a seat on turn is given before a server-side auto-fold.
    /// Zero disables the timer, which is the documented default (spec §5:
    /// "no automatic folding in the baseline, explicit leave required").
    pub action_timeout_secs: u64,
    /// Bound on each connection's outbound queue (spec §4.6/§5); overflow
    /// terminates that connection rather than blocking the table consumer.
    pub connection_queue_bound: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            log_level: env_or("LOG_LEVEL", "info"),
            num_tables: env_parsed_or("NUM_TABLES", 4),
            small_blind: env_parsed_or("SMALL_BLIND", 5),
            big_blind: env_parsed_or("BIG_BLIND", 10),
            starting_stack: env_parsed_or("STARTING_STACK", 1000),
            action_timeout_secs: env_parsed_or("ACTION_TIMEOUT_SECS", 0),
            connection_queue_bound: env_parsed_or("CONNECTION_QUEUE_BOUND", 64),
        }
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        (self.action_timeout_secs > 0).then(|| Duration::from_secs(self.action_timeout_secs))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        for key in [
            "BIND_ADDR",
            "LOG_LEVEL",
            "NUM_TABLES",
            "SMALL_BLIND",
            "BIG_BLIND",
            "STARTING_STACK",
            "ACTION_TIMEOUT_SECS",
            "CONNECTION_QUEUE_BOUND",
        ] {
            unsafe { std::env::remove_var(key) };
        }
        let config = Config::from_env();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.num_tables, 4);
        assert_eq!(config.small_blind, 5);
        assert_eq!(config.big_blind, 10);
        assert_eq!(config.starting_stack, 1000);
        assert_eq!(config.action_timeout(), None);
    }
}
