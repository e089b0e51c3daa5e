//! Process-wide structured logging.
//!
//! Library crates (gate, connectors, nexus, replay) only ever call the
//! `tracing` macros; installing a subscriber is the binary's job. This
//! mirrors `packages/gate/src/bin/server.rs`'s `tracing_subscriber::registry()`
//! call, generalized so every binary in the workspace shares it.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG` via `EnvFilter`, defaulting to `info` when unset. Safe to
/// call at most once per process; the gateway binary calls this before
/// building its router.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
