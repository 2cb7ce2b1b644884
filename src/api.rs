//! Inbound HTTP surface: router, shared state, the shared-secret guard, and
//! the error-to-response mapping.

pub mod handlers;
pub mod models;
pub mod webhook;

// std
use std::future::Future;
// crates.io
use axum::{
	Json as AxumJson, Router,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	availability::AvailabilityCache,
	catalog::CatalogCache,
	config::{ConfigError, Settings},
	upstream::UpstreamClient,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	/// Immutable service settings.
	pub settings: Arc<Settings>,
	/// Authenticated upstream client.
	pub upstream: Arc<UpstreamClient>,
	/// Process-wide catalog cache.
	pub catalog: Arc<CatalogCache>,
	/// Process-wide availability response cache.
	pub availability: Arc<AvailabilityCache>,
}
impl AppState {
	/// Builds the state and its caches from settings.
	pub fn new(settings: Settings) -> Result<Self, ConfigError> {
		let upstream = Arc::new(UpstreamClient::new(settings.clone())?);
		let catalog = Arc::new(CatalogCache::new(settings.catalog.clone()));
		let availability = Arc::new(AvailabilityCache::new(settings.availability.ttl));

		Ok(Self { settings: Arc::new(settings), upstream, catalog, availability })
	}
}

/// Assembles the full inbound router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(handlers::root))
		.route("/healthz", get(handlers::healthz))
		.route("/catalog", get(handlers::catalog))
		.route("/resolve-package", get(handlers::resolve_package))
		.route("/availability", get(handlers::availability))
		.route("/product-availability", get(handlers::product_availability))
		.route("/bookings", post(handlers::create_booking))
		.route("/bookings/{booking_id}/checkout", post(handlers::checkout))
		.route("/webhooks/roller", post(webhook::receive))
		.route("/debug/oauth", get(handlers::debug_oauth))
		.with_state(state)
}

/// Binds the listener and serves until the shutdown future resolves.
pub async fn serve<F>(state: AppState, shutdown: F) -> std::io::Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	let bind_addr = state.settings.bind_addr;
	let listener = tokio::net::TcpListener::bind(bind_addr).await?;

	tracing::info!(addr = %bind_addr, "roller-bridge listening");

	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

/// Enforces the `X-API-Key` shared secret; skipped when none is configured
/// (explicit operator opt-out).
pub fn require_shared_key(settings: &Settings, headers: &HeaderMap) -> Result<()> {
	let Some(expected) = settings.shared_key.as_deref() else {
		return Ok(());
	};

	match headers.get("x-api-key").and_then(|value| value.to_str().ok()) {
		Some(provided) if provided == expected => Ok(()),
		_ => Err(Error::Unauthorized),
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, code) = match &self {
			Error::AuthConfig { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "auth_config"),
			Error::UpstreamAuth { .. } | Error::TokenResponseParse(_) =>
				(StatusCode::BAD_GATEWAY, "upstream_auth"),
			Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream"),
			Error::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
			Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
		};
		let mut body = json!({ "error": code, "detail": self.to_string() });

		if let Error::Upstream { status: Some(upstream_status), .. } = &self {
			body["upstreamStatus"] = json!(upstream_status);
		}

		(status, AxumJson(body)).into_response()
	}
}
