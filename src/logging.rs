//! Tracing subscriber setup for the binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, checked before `RUST_LOG`.
pub const ENV_LOG: &str = "CARTOGRAPH_LOG";

/// Default level for a `-v` count.
#[must_use]
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Picks the filter directive: `CARTOGRAPH_LOG`, then `RUST_LOG`, then the
/// verbosity default.
#[must_use]
pub fn directive(env: impl Fn(&str) -> Option<String>, verbosity: u8) -> String {
    [ENV_LOG, "RUST_LOG"]
        .into_iter()
        .filter_map(env)
        .find(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_level(verbosity).to_string())
}

/// Installs a stderr subscriber. A second call, or a call after another
/// subscriber was installed, is ignored.
pub fn init(verbosity: u8) {
    let directive = directive(|k| std::env::var(k).ok(), verbosity);
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_level(0), "warn");
        assert_eq!(default_level(1), "info");
        assert_eq!(default_level(2), "debug");
        assert_eq!(default_level(9), "trace");
    }

    #[test]
    fn own_variable_wins_over_rust_log() {
        let env = |k: &str| match k {
            ENV_LOG => Some("cartograph=debug".to_string()),
            "RUST_LOG" => Some("error".to_string()),
            _ => None,
        };
        assert_eq!(directive(env, 0), "cartograph=debug");

        let only_rust_log = |k: &str| (k == "RUST_LOG").then(|| "error".to_string());
        assert_eq!(directive(only_rust_log, 0), "error");

        let blank = |k: &str| (k == ENV_LOG).then(String::new);
        assert_eq!(directive(blank, 1), "info");
    }
}
