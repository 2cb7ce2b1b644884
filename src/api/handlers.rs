//! Request handlers: thin shims that shape a request, borrow outbound
//! credentials, call upstream, and pass the response through with light
//! renaming.

// crates.io
use axum::{
	Json as AxumJson,
	extract::{Path, Query, State},
	http::HeaderMap,
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{
		AppState,
		models::{BookingRequest, CheckoutRequest},
		require_shared_key,
	},
	availability::{annotate_neighbors, parse_hhmm, validate_date},
	catalog::resolve,
};

/// Seconds a validate-and-reserve soft hold stays open while the caller decides.
const RESERVE_HOLD_TTL_SECONDS: u32 = 900;

/// Query string for `/resolve-package`.
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
	/// Free-text phrase to resolve.
	pub q: String,
}

/// Query string for `/availability` (validate-and-reserve).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveQuery {
	/// Upstream product identifier.
	pub product_id: String,
	/// Strict `YYYY-MM-DD` date.
	pub date: String,
	/// Requested duration in minutes.
	#[serde(default = "default_duration")]
	pub duration: u32,
	/// Requested resource type.
	#[serde(default = "default_resource")]
	pub resource_type: String,
	/// Requested resource quantity.
	#[serde(default = "default_quantity")]
	pub quantity: u32,
	/// Optional strict `HH:MM` start time.
	#[serde(default)]
	pub start_time: Option<String>,
}

/// Query string for `/product-availability`; upstream spells its parameters
/// in PascalCase, and the lowercase `date` alias is accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct ProductAvailabilityQuery {
	/// Strict `YYYY-MM-DD` date (canonical spelling).
	#[serde(rename = "Date", default)]
	pub date: Option<String>,
	/// Lowercase alias for `Date`.
	#[serde(rename = "date", default)]
	pub date_alias: Option<String>,
	/// Optional upstream product category filter.
	#[serde(rename = "ProductCategory", default)]
	pub product_category: Option<String>,
	/// Optional comma-separated upstream product id filter.
	#[serde(rename = "ProductIds", default)]
	pub product_ids: Option<String>,
	/// Optional strict `HH:MM` preferred time for neighbor selection.
	#[serde(rename = "preferredTime", default)]
	pub preferred_time: Option<String>,
}

/// Service banner with the route list.
pub async fn root() -> AxumJson<Json> {
	AxumJson(json!({
		"status": "ok",
		"message": "roller-bridge is running",
		"routes": ["/healthz", "/catalog", "/resolve-package", "/product-availability", "/bookings"],
	}))
}

/// Liveness probe.
pub async fn healthz() -> AxumJson<Json> {
	AxumJson(json!({ "ok": true }))
}

/// Returns the normalized catalog sorted by name, plus a count.
pub async fn catalog(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;

	let mut items = state.catalog.items(&state.upstream).await?;

	items.sort_by_cached_key(|item| item.name.to_lowercase());

	let count = items.len();

	Ok(AxumJson(json!({ "items": items, "count": count })))
}

/// Resolves a free-text phrase against the catalog.
pub async fn resolve_package(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<ResolveQuery>,
) -> Result<AxumJson<resolve::MatchResult>> {
	require_shared_key(&state.settings, &headers)?;

	let items = state.catalog.items(&state.upstream).await?;

	Ok(AxumJson(resolve::resolve(&query.q, &items)))
}

/// Proxies the validate-and-reserve capacity flow, opening a 15-minute soft
/// hold and annotating the response with the first two slots as `nearest`.
pub async fn availability(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<ReserveQuery>,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;
	validate_date(&query.date)?;

	if let Some(start_time) = &query.start_time {
		parse_hhmm(start_time)?;
	}

	let mut payload = json!({
		"productId": query.product_id,
		"date": query.date,
		"durationMinutes": query.duration,
		"resourceType": query.resource_type,
		"quantity": query.quantity,
		"hold": { "ttlSeconds": RESERVE_HOLD_TTL_SECONDS },
	});

	if let Some(start_time) = &query.start_time {
		payload["startTime"] = json!(start_time);
	}

	let mut data = state.upstream.validate_and_reserve(&payload).await?;

	if let Json::Object(map) = &mut data {
		let nearest = map
			.get("slots")
			.and_then(Json::as_array)
			.map(|slots| slots.iter().take(2).cloned().collect())
			.unwrap_or_default();

		map.insert("nearest".into(), Json::Array(nearest));
	}

	Ok(AxumJson(data))
}

/// Proxies the availability lookup through the TTL cache, selecting
/// per-product neighbor sessions when a preferred time is given.
pub async fn product_availability(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<ProductAvailabilityQuery>,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;

	let date = query
		.date
		.or(query.date_alias)
		.ok_or_else(|| Error::validation("date must be YYYY-MM-DD"))?;

	validate_date(&date)?;

	// Validate before any upstream call is attempted.
	if let Some(preferred) = &query.preferred_time {
		parse_hhmm(preferred)?;
	}

	let key = (date.clone(), query.product_category.clone(), query.product_ids.clone());
	let mut data = match state.availability.get(&key) {
		Some(cached) => cached,
		None => {
			let fetched = state
				.upstream
				.fetch_availability(
					&date,
					query.product_category.as_deref(),
					query.product_ids.as_deref(),
				)
				.await?;

			state.availability.put(key, fetched.clone());

			fetched
		},
	};

	if let Some(preferred) = &query.preferred_time {
		annotate_neighbors(&mut data, preferred)?;
	}

	Ok(AxumJson(data))
}

/// Validates a booking payload and forwards it verbatim to upstream.
pub async fn create_booking(
	State(state): State<AppState>,
	headers: HeaderMap,
	AxumJson(booking): AxumJson<BookingRequest>,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;
	booking.validate()?;

	let payload =
		serde_json::to_value(&booking).map_err(|e| Error::validation(e.to_string()))?;
	let created = state.upstream.create_booking(&payload).await?;

	Ok(AxumJson(created))
}

/// Forwards a checkout-session request for an existing booking.
pub async fn checkout(
	State(state): State<AppState>,
	Path(booking_id): Path<String>,
	headers: HeaderMap,
	AxumJson(body): AxumJson<CheckoutRequest>,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;
	body.validate()?;

	let payload = serde_json::to_value(&body).map_err(|e| Error::validation(e.to_string()))?;
	let session = state.upstream.create_checkout(&booking_id, &payload).await?;

	Ok(AxumJson(session))
}

/// Exercises every token negotiation style and reports the raw outcomes.
///
/// Operational/debug surface, not for production traffic.
pub async fn debug_oauth(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<AxumJson<Json>> {
	require_shared_key(&state.settings, &headers)?;

	let attempts = state.upstream.probe_token_styles().await?;

	Ok(AxumJson(json!({ "attempts": attempts })))
}

fn default_duration() -> u32 {
	120
}

fn default_resource() -> String {
	"room".into()
}

fn default_quantity() -> u32 {
	1
}
