//! Thin `tracing`/`tracing-subscriber` init facade used by the server
//! binary and every library crate's `tracing::instrument`/`event!` call
//! sites.
//!
//! Categories (`Network`, `MessageCoding`, `ServerConnect`, ...) crossed
//! with a numeric priority (`Error` .. `Debug3`) become `tracing` targets
//! instead of an ad-hoc bitmask: each crate's modules already use names
//! like `openrti_protocol::handshake` or `openrti_server::federation` as
//! their target, and `EnvFilter` directives
//! (`RUST_LOG=openrti_protocol::handshake=debug`) give the same
//! per-subsystem granularity.

use tracing_subscriber::EnvFilter;

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Maps a `-v`-style repeat count to a default `EnvFilter` directive,
/// mirroring the original's `Priority` ladder (`Error` < `Warning` <
/// `Info` < `Debug` < `Debug1` < `Debug2` < `Debug3`).
#[must_use]
pub fn default_filter_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a global `tracing` subscriber. `RUST_LOG` always wins over
/// `verbosity` when set, matching `EnvFilter::from_default_env`'s usual
/// precedence. Safe to call at most once per process; a second call is a
/// silent no-op rather than a panic, since both the server binary and
/// its integration tests may race to initialize logging.
pub fn init(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_for_verbosity(verbosity)));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = match format {
        LogFormat::Compact => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
    // try_init fails only if a global subscriber is already installed.
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ladder_matches_priority_ordering() {
        assert_eq!(default_filter_for_verbosity(0), "warn");
        assert_eq!(default_filter_for_verbosity(1), "info");
        assert_eq!(default_filter_for_verbosity(2), "debug");
        assert_eq!(default_filter_for_verbosity(3), "trace");
        assert_eq!(default_filter_for_verbosity(255), "trace");
    }

    #[test]
    fn init_is_idempotent() {
        init(1, LogFormat::Compact);
        init(1, LogFormat::Compact);
    }
}
