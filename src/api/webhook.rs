//! Webhook receipt for upstream booking/payment events.
//!
//! Receipt is deliberately fail-soft: malformed JSON yields 400, everything
//! else acknowledges with 200 so upstream never enters a retry storm. The one
//! exception is signature verification—when a webhook secret is configured, a
//! missing or invalid signature is rejected with 401, because acknowledging a
//! forged event would defeat the check.

// crates.io
use axum::{
	Json as AxumJson,
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
// self
use crate::{_prelude::*, api::AppState};

/// Header carrying the lowercase hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-roller-signature";

type HmacSha256 = Hmac<Sha256>;

/// Accepts an upstream event callback.
pub async fn receive(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	if let Some(secret) = state.settings.webhook_secret.as_deref() {
		let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());

		if !signature_valid(secret, signature, &body) {
			tracing::warn!("webhook rejected: invalid signature");

			return (
				StatusCode::UNAUTHORIZED,
				AxumJson(json!({ "error": "unauthorized", "detail": "invalid webhook signature" })),
			)
				.into_response();
		}
	}

	match serde_json::from_slice::<Json>(&body) {
		Err(_) => (
			StatusCode::BAD_REQUEST,
			AxumJson(json!({ "error": "validation", "detail": "invalid JSON" })),
		)
			.into_response(),
		Ok(event) => {
			let kind = event.get("type").and_then(Json::as_str).unwrap_or("unknown");

			tracing::info!(kind, "webhook received");

			(StatusCode::OK, AxumJson(json!({ "received": true }))).into_response()
		},
	}
}

/// Checks a lowercase hex HMAC-SHA256 signature over the raw body.
pub fn signature_valid(secret: &str, signature: Option<&str>, body: &[u8]) -> bool {
	let Some(raw) = signature else {
		return false;
	};
	let Ok(expected) = hex::decode(raw.trim()) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
		return false;
	};

	mac.update(body);

	mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn sign(secret: &str, body: &[u8]) -> String {
		let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
			.expect("HMAC-SHA256 accepts any key length.");

		mac.update(body);

		hex::encode(mac.finalize().into_bytes())
	}

	#[test]
	fn valid_signature_is_accepted() {
		let body = br#"{"type":"payment.succeeded"}"#;
		let signature = sign("webhook-secret", body);

		assert!(signature_valid("webhook-secret", Some(&signature), body));
	}

	#[test]
	fn tampered_body_is_rejected() {
		let signature = sign("webhook-secret", b"original");

		assert!(!signature_valid("webhook-secret", Some(&signature), b"tampered"));
	}

	#[test]
	fn missing_or_malformed_signatures_are_rejected() {
		assert!(!signature_valid("webhook-secret", None, b"body"));
		assert!(!signature_valid("webhook-secret", Some("not-hex!"), b"body"));
	}
}
