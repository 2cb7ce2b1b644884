//! Strict date/time validation, preferred-time neighbor selection, and a
//! TTL-keyed cache for upstream availability responses.

// crates.io
use parking_lot::Mutex;
use serde_json::json;
use time::{Date, Time, format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::_prelude::*;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem] = format_description!("[hour]:[minute]");

/// Validates a strictly formatted `YYYY-MM-DD` date.
pub fn validate_date(raw: &str) -> Result<()> {
	if raw.len() == 10 && Date::parse(raw, DATE_FORMAT).is_ok() {
		return Ok(());
	}

	Err(Error::validation("date must be YYYY-MM-DD"))
}

/// Parses a strictly formatted `HH:MM` time into minutes since midnight.
pub fn parse_hhmm(raw: &str) -> Result<u32> {
	if raw.len() == 5 {
		if let Ok(parsed) = Time::parse(raw, TIME_FORMAT) {
			return Ok(u32::from(parsed.hour()) * 60 + u32::from(parsed.minute()));
		}
	}

	Err(Error::validation("time must be HH:MM"))
}

/// Annotates each product in an availability payload with the sessions nearest
/// to the preferred time: the closest session plus one neighbor on each side,
/// sorted by start time.
///
/// Products without parseable sessions are left untouched; each annotated
/// product gains `preferred` and `neighborSessions` fields and has its session
/// list re-sorted by start time.
pub fn annotate_neighbors(payload: &mut Json, preferred: &str) -> Result<()> {
	let preferred_minutes = parse_hhmm(preferred)?;
	let Json::Array(products) = payload else {
		return Ok(());
	};

	for product in products.iter_mut() {
		let Some(sessions) = product.get("sessions").and_then(Json::as_array) else {
			continue;
		};
		let mut timed = sessions
			.iter()
			.filter_map(|session| {
				let start = session.get("startTime").and_then(Json::as_str)?;

				parse_hhmm(start).ok().map(|minutes| (minutes, session.clone()))
			})
			.collect::<Vec<_>>();

		if timed.is_empty() {
			continue;
		}

		timed.sort_by_key(|(minutes, _)| *minutes);

		let nearest = nearest_index(&timed, preferred_minutes);
		let neighbors = timed[nearest.saturating_sub(1)..(nearest + 2).min(timed.len())]
			.iter()
			.map(|(_, session)| session.clone())
			.collect::<Vec<_>>();

		product["sessions"] = Json::Array(timed.into_iter().map(|(_, session)| session).collect());
		product["preferred"] = json!(preferred);
		product["neighborSessions"] = Json::Array(neighbors);
	}

	Ok(())
}

/// Index of the session whose start is closest to the preferred time; ties
/// break to the earlier session.
fn nearest_index(timed: &[(u32, Json)], preferred_minutes: u32) -> usize {
	let mut best = 0;
	let mut best_distance = u32::MAX;

	for (idx, (minutes, _)) in timed.iter().enumerate() {
		let distance = minutes.abs_diff(preferred_minutes);

		if distance < best_distance {
			best = idx;
			best_distance = distance;
		}
	}

	best
}

type CacheKey = (String, Option<String>, Option<String>);

struct CachedResponse {
	payload: Json,
	fetched_at: OffsetDateTime,
}

/// TTL-keyed cache of availability responses, keyed by date + product filters.
///
/// The lock is never held across network I/O; two requests racing past an
/// expired entry may both fetch, which is tolerated (last write wins, both
/// writes independently valid).
pub struct AvailabilityCache {
	ttl: Duration,
	entries: Mutex<HashMap<CacheKey, CachedResponse>>,
}
impl AvailabilityCache {
	/// Creates an empty cache with the provided time-to-live.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, entries: Mutex::new(HashMap::new()) }
	}

	/// Returns the cached payload for the key while it is fresh.
	pub fn get(&self, key: &CacheKey) -> Option<Json> {
		let entries = self.entries.lock();
		let entry = entries.get(key)?;

		if OffsetDateTime::now_utc() - entry.fetched_at < self.ttl {
			return Some(entry.payload.clone());
		}

		None
	}

	/// Stores a fresh payload for the key, replacing any prior entry.
	pub fn put(&self, key: CacheKey, payload: Json) {
		self.entries
			.lock()
			.insert(key, CachedResponse { payload, fetched_at: OffsetDateTime::now_utc() });
	}
}
