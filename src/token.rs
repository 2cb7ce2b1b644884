//! Single-slot memoization of the current upstream access token.
//!
//! The slot is re-validated on every bearer-mode request and refreshed through
//! the negotiator behind an async mutex, so concurrent callers racing past an
//! expired token piggy-back on one in-flight exchange instead of stampeding
//! the token endpoint.

// self
use crate::{_prelude::*, negotiate::TokenNegotiator};

/// Margin subtracted from the expiry instant to absorb upstream clock skew.
pub const SAFETY_MARGIN: Duration = Duration::seconds(60);
/// Upper bound applied to reported token lifetimes; instant arithmetic aborts
/// on out-of-range results, so absurd `expires_in` values are clamped here.
const MAX_LIFETIME: Duration = Duration::days(365);

/// The most recently obtained token and its absolute expiry instant.
#[derive(Clone)]
pub struct CachedToken {
	/// Opaque bearer token value.
	pub value: String,
	/// Absolute expiry instant derived from the grant's `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns `true` while the token may still be presented upstream.
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		!self.value.is_empty() && now < self.expires_at - SAFETY_MARGIN
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Process-wide single-slot token cache; the slot is replaced wholesale on
/// every refresh.
#[derive(Debug, Default)]
pub struct TokenCache {
	slot: AsyncMutex<Option<CachedToken>>,
}
impl TokenCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a usable bearer token, negotiating a fresh one on miss/expiry.
	///
	/// Negotiator failures propagate unchanged. The slot lock is held across
	/// the exchange so at most one negotiation is in flight at a time.
	pub async fn bearer(&self, negotiator: &TokenNegotiator) -> Result<String> {
		let mut slot = self.slot.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(cached) = slot.as_ref().filter(|token| token.is_usable_at(now)) {
			return Ok(cached.value.clone());
		}

		let grant = negotiator.negotiate().await?;
		let token =
			CachedToken { value: grant.access_token, expires_at: expiry_after(now, grant.expires_in) };
		let value = token.value.clone();

		tracing::debug!(expires_at = %token.expires_at, "token slot refreshed");

		*slot = Some(token);

		Ok(value)
	}

	/// Replaces the slot wholesale with the provided token.
	pub async fn prime(&self, token: CachedToken) {
		*self.slot.lock().await = Some(token);
	}
}

/// Absolute expiry instant for a grant, with the lifetime clamped to
/// [`MAX_LIFETIME`] so oversized `expires_in` values never overflow the
/// instant arithmetic.
fn expiry_after(now: OffsetDateTime, expires_in: u64) -> OffsetDateTime {
	let lifetime =
		i64::try_from(expires_in).map(Duration::seconds).unwrap_or(MAX_LIFETIME).min(MAX_LIFETIME);

	now + lifetime
}
