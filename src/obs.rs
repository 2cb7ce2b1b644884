//! Observability wiring: structured logging via `tracing`.

// std
use std::sync::OnceLock;
// crates.io
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes the tracing subscriber with an env-driven filter.
///
/// Defaults to `info` when `RUST_LOG` is unset. Idempotent so tests can call
/// it freely.
pub fn init_tracing() {
	INIT.get_or_init(|| {
		let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
		let _ = tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer())
			.try_init();
	});
}
