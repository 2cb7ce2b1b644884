//! TTL-bounded, normalized view of the upstream product catalog.
//!
//! Upstream product records vary by tenant, so normalization applies a
//! prioritized list of field-name aliases per target attribute; records that
//! resolve neither an id nor a name are dropped silently (partial catalogs are
//! acceptable, malformed entries are not fatal).

pub mod resolve;
pub mod similarity;

// self
use crate::{_prelude::*, config::CatalogSettings, upstream::UpstreamClient};

/// Field-name aliases tried in order when resolving a product id.
const ID_ALIASES: [&str; 4] = ["parentProductId", "id", "productId", "code"];
/// Field-name aliases tried in order when resolving a product name.
const NAME_ALIASES: [&str; 3] = ["parentProductName", "name", "title"];
/// Field-name aliases tried in order when resolving a duration.
const DURATION_ALIASES: [&str; 2] = ["duration", "durationMinutes"];
/// Field-name aliases tried in order when resolving resource types.
const RESOURCE_ALIASES: [&str; 2] = ["resourceTypes", "resourceType"];
/// Duration assumed when no alias resolves a positive value.
const DEFAULT_DURATION_MINUTES: u32 = 120;

/// One normalized catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
	/// Upstream product identifier; never empty.
	pub product_id: String,
	/// Display name; never empty.
	pub name: String,
	/// Session duration in minutes; always positive.
	pub duration_minutes: u32,
	/// Resource types the product occupies (rooms, tables, ...).
	pub resource_types: Vec<String>,
}

/// Normalizes one raw upstream record, or skips it when id or name is missing.
pub fn normalize_record(raw: &Json) -> Option<CatalogItem> {
	let product_id = first_string(raw, &ID_ALIASES)?;
	let name = first_string(raw, &NAME_ALIASES)?;

	Some(CatalogItem {
		product_id,
		name,
		duration_minutes: first_duration(raw),
		resource_types: resource_types(raw),
	})
}

/// Normalizes a whole catalog payload (a bare list or `{"items": [...]}`),
/// applying the optional case-insensitive name filter.
pub fn normalize_catalog(payload: &Json, name_filter: Option<&str>) -> Vec<CatalogItem> {
	let records = match payload {
		Json::Array(list) => list.as_slice(),
		Json::Object(map) =>
			map.get("items").and_then(Json::as_array).map_or(&[][..], |list| list.as_slice()),
		_ => &[],
	};

	records
		.iter()
		.filter_map(normalize_record)
		.filter(|item| match name_filter {
			Some(filter) => item.name.to_lowercase().contains(filter),
			None => true,
		})
		.collect()
}

fn first_string(raw: &Json, aliases: &[&str]) -> Option<String> {
	aliases.iter().find_map(|alias| match raw.get(alias) {
		Some(Json::String(value)) if !value.is_empty() => Some(value.clone()),
		Some(Json::Number(value)) => Some(value.to_string()),
		_ => None,
	})
}

// Tenants report durations as integers or floats; both coerce, saturating
// into u32 and truncating fractions.
fn first_duration(raw: &Json) -> u32 {
	DURATION_ALIASES
		.iter()
		.find_map(|alias| raw.get(alias).and_then(Json::as_f64))
		.filter(|minutes| minutes.is_finite() && *minutes >= 1.0)
		.map(|minutes| minutes as u32)
		.unwrap_or(DEFAULT_DURATION_MINUTES)
}

fn resource_types(raw: &Json) -> Vec<String> {
	for alias in RESOURCE_ALIASES {
		match raw.get(alias) {
			Some(Json::Array(values)) => {
				return values.iter().filter_map(Json::as_str).map(str::to_owned).collect();
			},
			Some(Json::String(value)) if !value.is_empty() => return vec![value.clone()],
			_ => {},
		}
	}

	Vec::new()
}

struct CatalogSnapshot {
	items: Vec<CatalogItem>,
	fetched_at: OffsetDateTime,
}

/// Process-wide single-slot catalog cache, replaced wholesale on refresh.
///
/// An empty snapshot is treated as "never fetched": the TTL check is skipped
/// and a refresh is forced. A populated-but-expired snapshot is NOT served as
/// a fallback when the refresh fails; the error surfaces to the caller and the
/// old snapshot stays in the slot for the next attempt.
pub struct CatalogCache {
	slot: AsyncMutex<Option<CatalogSnapshot>>,
	settings: CatalogSettings,
}
impl CatalogCache {
	/// Creates an empty cache with the provided knobs.
	pub fn new(settings: CatalogSettings) -> Self {
		Self { slot: AsyncMutex::new(None), settings }
	}

	/// Returns the normalized catalog, fetching from upstream only when the
	/// snapshot is empty or older than the TTL.
	///
	/// The slot lock is held across the refresh so concurrent stale readers
	/// piggy-back on one upstream fetch.
	pub async fn items(&self, upstream: &UpstreamClient) -> Result<Vec<CatalogItem>> {
		let mut slot = self.slot.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(snapshot) = slot.as_ref() {
			if !snapshot.items.is_empty() && now - snapshot.fetched_at < self.settings.ttl {
				return Ok(snapshot.items.clone());
			}
		}

		let payload = upstream.fetch_products().await?;
		let items = normalize_catalog(&payload, self.settings.name_filter.as_deref());

		tracing::debug!(count = items.len(), "catalog snapshot refreshed");

		*slot = Some(CatalogSnapshot { items: items.clone(), fetched_at: now });

		Ok(items)
	}
}
