//! Binary entrypoint: load configuration, wire state, serve until ctrl-c.

// crates.io
use roller_bridge::{api, config::Settings, obs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	obs::init_tracing();

	let settings = Settings::from_env()?;
	let state = api::AppState::new(settings)?;

	api::serve(state, async {
		let _ = tokio::signal::ctrl_c().await;

		tracing::info!("shutdown signal received");
	})
	.await?;

	Ok(())
}
