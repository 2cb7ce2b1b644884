// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use roller_bridge::{
	config::{AuthMode, UpstreamCredentials},
	negotiate::{NegotiationStyle, TokenNegotiator},
	token::{CachedToken, TokenCache},
};

fn negotiator(server: &MockServer) -> TokenNegotiator {
	let credentials = UpstreamCredentials {
		base_url: Url::parse(&server.base_url()).expect("Mock base URL should parse."),
		auth_mode: AuthMode::Bearer,
		token_url: Some(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
		),
		client_id: Some("bridge-client".into()),
		client_secret: Some("bridge-secret".into()),
		static_api_key: None,
		preferred_style: NegotiationStyle::Basic,
		scope: None,
		audience: None,
	};

	TokenNegotiator::new(reqwest::Client::new(), credentials)
}

#[tokio::test]
async fn cached_token_is_reused_across_calls() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"long-lived\",\"expires_in\":3600}");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();
	let first = cache.bearer(&negotiator).await.expect("First bearer call should succeed.");
	let second = cache.bearer(&negotiator).await.expect("Second bearer call should succeed.");

	token_mock.assert_hits_async(1).await;

	assert_eq!(first, "long-lived");
	assert_eq!(first, second);
}

#[tokio::test]
async fn token_inside_the_safety_margin_is_renegotiated() {
	let server = MockServer::start_async().await;
	// 30 seconds is already within the 60-second margin, so every call refreshes.
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"short-lived\",\"expires_in\":30}");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();

	cache.bearer(&negotiator).await.expect("First bearer call should succeed.");
	cache.bearer(&negotiator).await.expect("Second bearer call should succeed.");

	token_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn oversized_expiry_grants_are_clamped_and_cached() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"immortal\",\"expires_in\":18446744073709551615}");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();
	let first = cache.bearer(&negotiator).await.expect("Oversized expiry should not fail.");
	let second = cache.bearer(&negotiator).await.expect("Clamped token should be reused.");

	token_mock.assert_hits_async(1).await;

	assert_eq!(first, "immortal");
	assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"shared\",\"expires_in\":3600}");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();
	let (first, second) = tokio::join!(cache.bearer(&negotiator), cache.bearer(&negotiator));

	token_mock.assert_hits_async(1).await;

	assert_eq!(first.expect("First concurrent call should succeed."), "shared");
	assert_eq!(second.expect("Second concurrent call should succeed."), "shared");
}

#[tokio::test]
async fn primed_token_suppresses_negotiation() {
	let server = MockServer::start_async().await;
	let untouched = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500).body("should never be called");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();

	cache
		.prime(CachedToken {
			value: "primed".into(),
			expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
		})
		.await;

	let bearer = cache.bearer(&negotiator).await.expect("Primed bearer call should succeed.");

	untouched.assert_hits_async(0).await;

	assert_eq!(bearer, "primed");
}

#[tokio::test]
async fn negotiation_failure_leaves_the_slot_empty() {
	let server = MockServer::start_async().await;
	let reject_all = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).body("{\"error\":\"access_denied\"}");
		})
		.await;
	let negotiator = negotiator(&server);
	let cache = TokenCache::new();

	cache.bearer(&negotiator).await.expect_err("Bearer call should fail when all styles fail.");
	cache.bearer(&negotiator).await.expect_err("Retry should negotiate again, not reuse.");

	// Three styles per bearer call, twice.
	reject_all.assert_hits_async(6).await;
}
