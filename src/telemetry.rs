//! Tracing setup for binaries and tests embedding the engine.
//!
//! The engine itself only emits `tracing` events (debug on applied commands,
//! warnings on guard panics and corrupted state); hosts decide whether and
//! how to subscribe. `init_tracing` wires the common case: fmt output with
//! an env-filter honoring `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info,agendaflow=info` when `RUST_LOG` is unset or invalid.
/// Calling this twice is a no-op (the second `init` attempt is discarded),
/// so tests may call it freely.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agendaflow=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
