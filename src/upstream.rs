//! Outbound surface of the bridge: authorization header construction plus the
//! upstream REST calls for products, capacity, availability, bookings, and
//! checkout sessions.
//!
//! Every call carries an explicit timeout and surfaces non-2xx or network
//! failures as [`Error::Upstream`] with a truncated diagnostic body. No
//! automatic retries are performed; retry policy belongs to the caller.

// crates.io
use reqwest::{Client as ReqwestClient, RequestBuilder};
// self
use crate::{
	_prelude::*,
	config::{AuthMode, ConfigError, Settings},
	negotiate::{StyleProbe, TokenNegotiator},
	token::TokenCache,
};

/// Timeout for upstream reads (catalog, capacity, availability).
const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);
/// Timeout for upstream writes (bookings, checkout sessions).
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Outbound auth header produced for every upstream call.
#[derive(Clone)]
pub enum AuthHeader {
	/// `Authorization: Bearer <token>` sourced from the token cache.
	Bearer(String),
	/// Tenant `x-api-key` header in static-key mode.
	StaticKey(String),
}
impl AuthHeader {
	/// Applies the header to an outbound request.
	pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
		match self {
			Self::Bearer(token) => request.bearer_auth(token),
			Self::StaticKey(key) => request.header("x-api-key", key),
		}
	}
}
impl Debug for AuthHeader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Bearer(_) => f.write_str("AuthHeader::Bearer(<redacted>)"),
			Self::StaticKey(_) => f.write_str("AuthHeader::StaticKey(<redacted>)"),
		}
	}
}

/// Authenticated client for the upstream booking API.
#[derive(Debug)]
pub struct UpstreamClient {
	http: ReqwestClient,
	settings: Settings,
	negotiator: TokenNegotiator,
	token_cache: TokenCache,
}
impl UpstreamClient {
	/// Builds the client and its shared HTTP transport.
	pub fn new(settings: Settings) -> Result<Self, ConfigError> {
		let http = ReqwestClient::builder()
			.timeout(READ_TIMEOUT)
			.build()
			.map_err(|e| ConfigError::HttpClient { reason: e.to_string() })?;
		let negotiator = TokenNegotiator::new(http.clone(), settings.upstream.clone());

		Ok(Self { http, settings, negotiator, token_cache: TokenCache::new() })
	}

	/// Produces the outbound auth header for the configured mode.
	///
	/// Bearer mode consults the token cache (negotiating on miss/expiry);
	/// static-key mode bypasses the cache entirely and fails with
	/// [`Error::AuthConfig`] when the key is absent.
	pub async fn auth_header(&self) -> Result<AuthHeader> {
		match self.settings.upstream.auth_mode {
			AuthMode::StaticKey => self
				.settings
				.upstream
				.static_api_key
				.clone()
				.map(AuthHeader::StaticKey)
				.ok_or_else(|| Error::auth_config("static-key mode requires ROLLER_API_KEY")),
			AuthMode::Bearer =>
				Ok(AuthHeader::Bearer(self.token_cache.bearer(&self.negotiator).await?)),
		}
	}

	/// Fetches the raw upstream product catalog payload.
	pub async fn fetch_products(&self) -> Result<Json> {
		let url = self.settings.upstream.endpoint(&self.settings.catalog.path);
		let request = self.http.get(url).timeout(READ_TIMEOUT);

		self.dispatch("catalog fetch", request, false).await
	}

	/// Runs the capacity validate-and-reserve flow for a single product/date.
	pub async fn validate_and_reserve(&self, payload: &Json) -> Result<Json> {
		let url = self.settings.upstream.endpoint("/api/v1/capacity/validate-and-reserve");
		let request = self.http.post(url).timeout(READ_TIMEOUT).json(payload);

		self.dispatch("capacity", request, false).await
	}

	/// Fetches the availability listing for a date with optional product filters.
	pub async fn fetch_availability(
		&self,
		date: &str,
		product_category: Option<&str>,
		product_ids: Option<&str>,
	) -> Result<Json> {
		let url = self.settings.upstream.endpoint(&self.settings.availability.path);
		let mut query = vec![("Date", date)];

		if let Some(category) = product_category {
			query.push(("ProductCategory", category));
		}
		if let Some(ids) = product_ids {
			query.push(("ProductIds", ids));
		}

		let request = self.http.get(url).timeout(READ_TIMEOUT).query(&query);

		self.dispatch("availability fetch", request, false).await
	}

	/// Forwards a validated booking payload to upstream booking creation.
	pub async fn create_booking(&self, payload: &Json) -> Result<Json> {
		let url = self.settings.upstream.endpoint("/api/v1/bookings");
		let request = self.http.post(url).timeout(WRITE_TIMEOUT).json(payload);

		self.dispatch("booking", request, true).await
	}

	/// Forwards a checkout-session request for an existing booking.
	pub async fn create_checkout(&self, booking_id: &str, payload: &Json) -> Result<Json> {
		let url = self.settings.upstream.endpoint(&format!("/api/v1/bookings/{booking_id}/checkout"));
		let request = self.http.post(url).timeout(WRITE_TIMEOUT).json(payload);

		self.dispatch("checkout", request, true).await
	}

	/// Exercises every token negotiation style for the debug surface.
	pub async fn probe_token_styles(&self) -> Result<Vec<StyleProbe>> {
		self.negotiator.probe().await
	}

	async fn dispatch(
		&self,
		context: &'static str,
		request: RequestBuilder,
		accept_created: bool,
	) -> Result<Json> {
		let request = self.auth_header().await?.apply(request);
		let response = request
			.header(reqwest::header::ACCEPT, "application/json")
			.send()
			.await
			.map_err(|e| Error::upstream(context, None, e.to_string()))?;
		let status = response.status().as_u16();
		let accepted = status == 200 || (accept_created && status == 201);

		if !accepted {
			let body = response.text().await.unwrap_or_default();

			return Err(Error::upstream(context, Some(status), body));
		}

		response
			.json()
			.await
			.map_err(|e| Error::upstream(context, Some(status), e.to_string()))
	}
}
