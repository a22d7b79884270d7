//! Tracing setup.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` overrides the default filter, e.g.
//! `RUST_LOG=crossroads=trace` to see every lock request.
//!
//! Log lines go to stderr. Stdout is reserved for the binary's `--json`
//! report.

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,crossroads=info";

/// Install a global fmt subscriber writing to stderr.
///
/// Colours are only used when stderr is a terminal.
///
/// Returns `false` if a subscriber was already installed, which happens
/// when tests or an embedding program got there first.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .is_ok()
}
