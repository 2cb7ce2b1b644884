// crates.io
use axum::{
	body::Body,
	http::{Request, StatusCode, header},
	response::Response,
};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;
use url::Url;
// self
use roller_bridge::{
	api::{AppState, router},
	config::{AuthMode, AvailabilitySettings, CatalogSettings, Settings, UpstreamCredentials},
	negotiate::NegotiationStyle,
};

const SHARED_KEY: &str = "front-door-secret";
const TENANT_KEY: &str = "tenant-key";

/// Static-key settings pointing every upstream path at the mock server.
fn settings(server: &MockServer) -> Settings {
	Settings {
		bind_addr: "127.0.0.1:0".parse().expect("Bind address fixture should parse."),
		shared_key: Some(SHARED_KEY.into()),
		webhook_secret: None,
		upstream: UpstreamCredentials {
			base_url: Url::parse(&server.base_url()).expect("Mock base URL should parse."),
			auth_mode: AuthMode::StaticKey,
			token_url: None,
			client_id: None,
			client_secret: None,
			static_api_key: Some(TENANT_KEY.into()),
			preferred_style: NegotiationStyle::Basic,
			scope: None,
			audience: None,
		},
		catalog: CatalogSettings::default(),
		availability: AvailabilitySettings::default(),
	}
}

fn app(settings: Settings) -> axum::Router {
	router(AppState::new(settings).expect("App state should build from test settings."))
}

fn get(uri: &str) -> Request<Body> {
	Request::builder()
		.uri(uri)
		.header("x-api-key", SHARED_KEY)
		.body(Body::empty())
		.expect("GET request fixture should build.")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("x-api-key", SHARED_KEY)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(payload.to_string()))
		.expect("POST request fixture should build.")
}

async fn body_json(response: Response) -> Value {
	let bytes = response
		.into_body()
		.collect()
		.await
		.expect("Response body should be collectable.")
		.to_bytes();

	serde_json::from_slice(&bytes).expect("Response body should be JSON.")
}

#[tokio::test]
async fn healthz_is_open_without_the_shared_key() {
	let server = MockServer::start_async().await;
	let app = app(settings(&server));
	let response = app
		.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
		.await
		.expect("Health check should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn guarded_routes_reject_a_missing_shared_key() {
	let server = MockServer::start_async().await;
	let app = app(settings(&server));
	let response = app
		.oneshot(Request::builder().uri("/catalog").body(Body::empty()).unwrap())
		.await
		.expect("Catalog route should respond.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let body = body_json(response).await;

	assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn catalog_is_normalized_sorted_and_cached() {
	let server = MockServer::start_async().await;
	let products_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/products").header("x-api-key", TENANT_KEY);
			then.status(200).header("content-type", "application/json").body(
				r#"{"items":[
					{"id":7,"title":"Zip Line"},
					{"parentProductId":"p-1","parentProductName":"Arcade Pass","duration":90},
					{"name":"orphan without an id"}
				]}"#,
			);
		})
		.await;
	let app = app(settings(&server));
	let first = app.clone().oneshot(get("/catalog")).await.expect("Catalog should respond.");

	assert_eq!(first.status(), StatusCode::OK);

	let body = body_json(first).await;

	assert_eq!(body["count"], 2);
	assert_eq!(body["items"][0]["name"], "Arcade Pass");
	assert_eq!(body["items"][0]["durationMinutes"], 90);
	assert_eq!(body["items"][1]["productId"], "7");
	assert_eq!(body["items"][1]["durationMinutes"], 120);

	// Second call inside the TTL is served from the snapshot.
	let second = app.oneshot(get("/catalog")).await.expect("Cached catalog should respond.");

	assert_eq!(second.status(), StatusCode::OK);
	products_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn resolve_package_matches_with_rounded_confidence() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(200).header("content-type", "application/json").body(
				r#"[
					{"id":"p-1","name":"Laser Tag"},
					{"id":"p-2","name":"Birthday Party Room","duration":120}
				]"#,
			);
		})
		.await;

	let app = app(settings(&server));
	let response = app
		.oneshot(get("/resolve-package?q=birthday%20room%20for%2010"))
		.await
		.expect("Resolver should respond.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;

	assert_eq!(body["matched"], true);
	assert_eq!(body["productId"], "p-2");
	assert_eq!(body["confidence"], 0.667);
}

#[tokio::test]
async fn resolve_package_offers_choices_below_threshold() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":"p-1","name":"Laser Tag"},{"id":"p-2","name":"Mini Golf"}]"#);
		})
		.await;

	let app = app(settings(&server));
	let response = app
		.oneshot(get("/resolve-package?q=corporate%20conference%20hall"))
		.await
		.expect("Resolver should respond.");
	let body = body_json(response).await;

	assert_eq!(body["matched"], false);
	assert_eq!(
		body["choices"].as_array().expect("Choices should be an array.").len(),
		2
	);
}

#[tokio::test]
async fn product_availability_rejects_a_loose_date_before_upstream() {
	let server = MockServer::start_async().await;
	let untouched = server
		.mock_async(|when, then| {
			when.method(GET).path("/product-availability");
			then.status(200).body("{}");
		})
		.await;
	let app = app(settings(&server));
	let response = app
		.oneshot(get("/product-availability?Date=2024-1-5"))
		.await
		.expect("Availability route should respond.");

	assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
	untouched.assert_hits_async(0).await;
}

#[tokio::test]
async fn product_availability_annotates_neighbor_sessions() {
	let server = MockServer::start_async().await;
	let availability_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/product-availability")
				.query_param("Date", "2025-07-04")
				.query_param("ProductCategory", "parties");
			then.status(200).header("content-type", "application/json").body(
				r#"[{"productId":"p-1","sessions":[
					{"startTime":"14:00"},
					{"startTime":"09:00"},
					{"startTime":"12:00"},
					{"startTime":"10:30"}
				]}]"#,
			);
		})
		.await;
	let app = app(settings(&server));
	let uri = "/product-availability?Date=2025-07-04&ProductCategory=parties&preferredTime=11:45";
	let response =
		app.clone().oneshot(get(uri)).await.expect("Availability route should respond.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;
	let product = &body[0];
	let starts: Vec<&str> = product["neighborSessions"]
		.as_array()
		.expect("Neighbor sessions should be an array.")
		.iter()
		.map(|session| session["startTime"].as_str().unwrap())
		.collect();

	assert_eq!(product["preferred"], "11:45");
	assert_eq!(starts, ["10:30", "12:00", "14:00"]);

	// Same date and filters inside the TTL come from the cache.
	let again = app.oneshot(get(uri)).await.expect("Cached availability should respond.");

	assert_eq!(again.status(), StatusCode::OK);
	availability_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn availability_opens_a_hold_and_reports_nearest_slots() {
	let server = MockServer::start_async().await;
	let capacity_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/capacity/validate-and-reserve").json_body(json!({
				"productId": "p-1",
				"date": "2025-07-04",
				"durationMinutes": 120,
				"resourceType": "room",
				"quantity": 1,
				"hold": { "ttlSeconds": 900 },
			}));
			then.status(200).header("content-type", "application/json").body(
				r#"{"slots":[{"startTime":"10:00"},{"startTime":"12:00"},{"startTime":"14:00"}],"reserveToken":"rt-1"}"#,
			);
		})
		.await;
	let app = app(settings(&server));
	let response = app
		.oneshot(get("/availability?productId=p-1&date=2025-07-04"))
		.await
		.expect("Reserve route should respond.");

	capacity_mock.assert_async().await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;

	assert_eq!(body["reserveToken"], "rt-1");
	assert_eq!(
		body["nearest"].as_array().expect("Nearest should be an array.").len(),
		2
	);
}

#[tokio::test]
async fn bookings_reject_out_of_bounds_payloads_locally() {
	let server = MockServer::start_async().await;
	let app = app(settings(&server));
	let payload = json!({
		"productId": "p-1",
		"start": "2025-07-04T10:00:00",
		"durationMinutes": 30,
		"resourceType": "room",
		"headcount": 10,
		"contact": { "firstName": "Ada", "email": "ada@example.com" },
		"partyLabel": "Ada's 10th",
	});
	let response = app
		.oneshot(post_json("/bookings", &payload))
		.await
		.expect("Bookings route should respond.");

	assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

	let body = body_json(response).await;

	assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn valid_bookings_are_forwarded_upstream() {
	let server = MockServer::start_async().await;
	let booking_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/bookings").header("x-api-key", TENANT_KEY);
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"id":"b-1","status":"confirmed"}"#);
		})
		.await;
	let app = app(settings(&server));
	let payload = json!({
		"productId": "p-1",
		"start": "2025-07-04T10:00:00",
		"resourceType": "room",
		"headcount": 12,
		"contact": { "firstName": "Ada", "email": "ada@example.com" },
		"partyLabel": "Ada's 10th",
	});
	let response = app
		.oneshot(post_json("/bookings", &payload))
		.await
		.expect("Bookings route should respond.");

	booking_mock.assert_async().await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;

	assert_eq!(body["id"], "b-1");
}

#[tokio::test]
async fn checkout_is_forwarded_for_the_booking() {
	let server = MockServer::start_async().await;
	let checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/bookings/b-1/checkout");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"checkoutUrl":"https://pay.example.com/s/abc"}"#);
		})
		.await;
	let app = app(settings(&server));
	let response = app
		.oneshot(post_json("/bookings/b-1/checkout", &json!({ "amount": 50.0 })))
		.await
		.expect("Checkout route should respond.");

	checkout_mock.assert_async().await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;

	assert_eq!(body["checkoutUrl"], "https://pay.example.com/s/abc");
}

#[tokio::test]
async fn upstream_failures_surface_as_bad_gateway() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(503).body("maintenance window");
		})
		.await;

	let app = app(settings(&server));
	let response = app.oneshot(get("/catalog")).await.expect("Catalog route should respond.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

	let body = body_json(response).await;

	assert_eq!(body["error"], "upstream");
	assert_eq!(body["upstreamStatus"], 503);
}

#[tokio::test]
async fn bearer_mode_negotiates_then_calls_upstream() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"bearer-token","expires_in":3600}"#);
		})
		.await;
	let products_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/products")
				.header("authorization", "Bearer bearer-token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":"p-1","name":"Arcade Pass"}]"#);
		})
		.await;
	let mut settings = settings(&server);

	settings.upstream.auth_mode = AuthMode::Bearer;
	settings.upstream.token_url =
		Some(Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."));
	settings.upstream.client_id = Some("bridge-client".into());
	settings.upstream.client_secret = Some("bridge-secret".into());

	let app = app(settings);
	let response = app.oneshot(get("/catalog")).await.expect("Catalog route should respond.");

	token_mock.assert_hits_async(1).await;
	products_mock.assert_hits_async(1).await;

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhooks_verify_signatures_when_a_secret_is_set() {
	let server = MockServer::start_async().await;
	let mut settings = settings(&server);

	settings.webhook_secret = Some("hook-secret".into());

	let app = app(settings);
	let body = br#"{"type":"payment.succeeded","bookingId":"b-1"}"#;
	let mut mac = Hmac::<Sha256>::new_from_slice(b"hook-secret")
		.expect("HMAC-SHA256 accepts any key length.");

	mac.update(body);

	let signature = hex::encode(mac.finalize().into_bytes());
	let signed = Request::builder()
		.method("POST")
		.uri("/webhooks/roller")
		.header("x-roller-signature", &signature)
		.body(Body::from(&body[..]))
		.unwrap();
	let accepted = app.clone().oneshot(signed).await.expect("Webhook route should respond.");

	assert_eq!(accepted.status(), StatusCode::OK);
	assert_eq!(body_json(accepted).await, json!({ "received": true }));

	let tampered = Request::builder()
		.method("POST")
		.uri("/webhooks/roller")
		.header("x-roller-signature", &signature)
		.body(Body::from(r#"{"type":"payment.failed"}"#))
		.unwrap();
	let rejected = app.oneshot(tampered).await.expect("Webhook route should respond.");

	assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhooks_reject_malformed_json_bodies() {
	let server = MockServer::start_async().await;
	let app = app(settings(&server));
	let request = Request::builder()
		.method("POST")
		.uri("/webhooks/roller")
		.body(Body::from("not json"))
		.unwrap();
	let response = app.oneshot(request).await.expect("Webhook route should respond.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = body_json(response).await;

	assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn debug_oauth_reports_every_style() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).body(r#"{"error":"access_denied"}"#);
		})
		.await;
	let mut settings = settings(&server);

	settings.upstream.auth_mode = AuthMode::Bearer;
	settings.upstream.token_url =
		Some(Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."));
	settings.upstream.client_id = Some("bridge-client".into());
	settings.upstream.client_secret = Some("bridge-secret".into());

	let app = app(settings);
	let response = app.oneshot(get("/debug/oauth")).await.expect("Debug route should respond.");

	token_mock.assert_hits_async(3).await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;
	let attempts = body["attempts"].as_array().expect("Attempts should be an array.");

	assert_eq!(attempts.len(), 3);
	assert_eq!(attempts[0]["style"], "basic");
	assert_eq!(attempts[0]["status"], 401);
}
