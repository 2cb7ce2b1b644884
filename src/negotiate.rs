//! Tolerant OAuth2 client-credentials negotiation against a token endpoint whose
//! wire conventions are not known in advance.
//!
//! Three styles are defined—[`NegotiationStyle::Basic`], [`NegotiationStyle::Body`],
//! and [`NegotiationStyle::Json`]—and a single driver loop tries the configured
//! preferred style first, then falls through the remaining two in declaration
//! order, stopping at the first 200. Adding a fourth style is a data change to
//! [`NegotiationStyle::ALL`], not a control-flow rewrite.

// std
use std::{collections::BTreeMap, str::FromStr};
// crates.io
use reqwest::Client as ReqwestClient;
// self
use crate::{_prelude::*, config::UpstreamCredentials, error};

/// Timeout applied to every token endpoint call.
const TOKEN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);
/// Expiry assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3_600;

/// Wire conventions for delivering client credentials to a token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStyle {
	/// Credentials in an HTTP Basic header; grant parameters as a form body.
	Basic,
	/// Credentials as additional URL-encoded form fields.
	Body,
	/// Credentials and grant parameters as a JSON request body.
	Json,
}
impl NegotiationStyle {
	/// Every known style, in the fixed fallback declaration order.
	pub const ALL: [Self; 3] = [Self::Basic, Self::Body, Self::Json];

	/// Returns a stable label suitable for logs and probe reports.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Basic => "basic",
			Self::Body => "body",
			Self::Json => "json",
		}
	}

	/// Computes the attempt order: the preferred style first, then the styles
	/// not yet tried in [`NegotiationStyle::ALL`] order.
	pub fn attempt_order(preferred: Self) -> [Self; 3] {
		let mut order = [preferred; 3];
		let mut cursor = 1;

		for style in Self::ALL {
			if style != preferred {
				order[cursor] = style;
				cursor += 1;
			}
		}

		order
	}
}
impl Display for NegotiationStyle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for NegotiationStyle {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"basic" => Ok(Self::Basic),
			"body" => Ok(Self::Body),
			"json" => Ok(Self::Json),
			other => Err(format!("unknown negotiation style `{other}`")),
		}
	}
}

/// Successful outcome of a token exchange.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Opaque bearer token value.
	pub access_token: String,
	/// Seconds until expiry, as reported by the token endpoint.
	pub expires_in: u64,
}

/// Raw outcome of one probe attempt, reported by the debug surface.
#[derive(Clone, Debug, Serialize)]
pub struct StyleProbe {
	/// Style exercised by the attempt.
	pub style: NegotiationStyle,
	/// HTTP status code, absent when the call failed at the transport layer.
	pub status: Option<u16>,
	/// Truncated response body or network error text.
	pub body: String,
}

#[derive(Deserialize)]
struct GrantResponse {
	access_token: Option<String>,
	expires_in: Option<u64>,
}

enum Attempt {
	Accepted { body: Vec<u8> },
	Rejected { status: u16, body: String },
	NetworkError { detail: String },
}

/// Performs client-credentials exchanges, tolerating unknown server conventions.
///
/// The negotiator has no side effects beyond the network calls; storing the
/// grant is the token cache's responsibility.
#[derive(Clone, Debug)]
pub struct TokenNegotiator {
	http: ReqwestClient,
	credentials: UpstreamCredentials,
}
impl TokenNegotiator {
	/// Creates a negotiator sharing the provided HTTP client.
	pub fn new(http: ReqwestClient, credentials: UpstreamCredentials) -> Self {
		Self { http, credentials }
	}

	/// Obtains a fresh access token, trying fallback styles on rejection.
	///
	/// Fails with [`Error::AuthConfig`] when the token endpoint or client
	/// credentials are missing, and with [`Error::UpstreamAuth`] carrying the
	/// last diagnostic when every style is rejected.
	pub async fn negotiate(&self) -> Result<TokenGrant> {
		let (token_url, client_id, client_secret) = self.required()?;
		let mut last_failure = String::from("no negotiation style attempted");

		for style in NegotiationStyle::attempt_order(self.credentials.preferred_style) {
			match self.attempt(style, token_url, client_id, client_secret).await {
				Attempt::Accepted { body } => return parse_grant(&body),
				Attempt::Rejected { status, body } => {
					tracing::warn!(style = style.as_str(), status, "token endpoint rejected style");

					last_failure = body;
				},
				Attempt::NetworkError { detail } => {
					tracing::warn!(style = style.as_str(), %detail, "token endpoint unreachable");

					last_failure = detail;
				},
			}
		}

		Err(Error::upstream_auth(last_failure))
	}

	/// Exercises every style once and reports the raw outcomes.
	///
	/// Diagnostic surface only: responses are not parsed and nothing is cached.
	pub async fn probe(&self) -> Result<Vec<StyleProbe>> {
		let (token_url, client_id, client_secret) = self.required()?;
		let mut probes = Vec::with_capacity(NegotiationStyle::ALL.len());

		for style in NegotiationStyle::attempt_order(self.credentials.preferred_style) {
			let probe = match self.attempt(style, token_url, client_id, client_secret).await {
				Attempt::Accepted { body } => StyleProbe {
					style,
					status: Some(200),
					body: error::truncate_preview(String::from_utf8_lossy(&body).into_owned()),
				},
				Attempt::Rejected { status, body } =>
					StyleProbe { style, status: Some(status), body },
				Attempt::NetworkError { detail } => StyleProbe { style, status: None, body: detail },
			};

			probes.push(probe);
		}

		Ok(probes)
	}

	fn required(&self) -> Result<(&Url, &str, &str)> {
		match (
			self.credentials.token_url.as_ref(),
			self.credentials.client_id.as_deref(),
			self.credentials.client_secret.as_deref(),
		) {
			(Some(url), Some(id), Some(secret)) => Ok((url, id, secret)),
			_ => Err(Error::auth_config(
				"bearer mode requires token URL, client id, and client secret",
			)),
		}
	}

	async fn attempt(
		&self,
		style: NegotiationStyle,
		token_url: &Url,
		client_id: &str,
		client_secret: &str,
	) -> Attempt {
		tracing::debug!(style = style.as_str(), "attempting token exchange");

		let mut params = BTreeMap::from([("grant_type", "client_credentials")]);

		if let Some(scope) = self.credentials.scope.as_deref() {
			params.insert("scope", scope);
		}
		if let Some(audience) = self.credentials.audience.as_deref() {
			params.insert("audience", audience);
		}

		let request = self
			.http
			.post(token_url.clone())
			.timeout(TOKEN_TIMEOUT)
			.header(reqwest::header::ACCEPT, "application/json");
		let request = match style {
			NegotiationStyle::Basic =>
				request.basic_auth(client_id, Some(client_secret)).form(&params),
			NegotiationStyle::Body => {
				params.insert("client_id", client_id);
				params.insert("client_secret", client_secret);

				request.form(&params)
			},
			NegotiationStyle::Json => {
				params.insert("client_id", client_id);
				params.insert("client_secret", client_secret);

				request.json(&params)
			},
		};

		match request.send().await {
			Err(e) => Attempt::NetworkError { detail: error::truncate_preview(e.to_string()) },
			Ok(response) => {
				let status = response.status().as_u16();
				let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();

				if status == 200 {
					Attempt::Accepted { body }
				} else {
					Attempt::Rejected {
						status,
						body: error::truncate_preview(String::from_utf8_lossy(&body).into_owned()),
					}
				}
			},
		}
	}
}

fn parse_grant(body: &[u8]) -> Result<TokenGrant> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let response: GrantResponse =
		serde_path_to_error::deserialize(&mut deserializer).map_err(Error::TokenResponseParse)?;
	let access_token = response
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or_else(|| Error::upstream_auth("token endpoint omitted access_token"))?;

	Ok(TokenGrant { access_token, expires_in: response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN) })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn attempt_order_puts_preferred_first() {
		use NegotiationStyle::*;

		assert_eq!(NegotiationStyle::attempt_order(Basic), [Basic, Body, Json]);
		assert_eq!(NegotiationStyle::attempt_order(Body), [Body, Basic, Json]);
		assert_eq!(NegotiationStyle::attempt_order(Json), [Json, Basic, Body]);
	}

	#[test]
	fn style_parses_case_insensitively() {
		assert_eq!("BASIC".parse::<NegotiationStyle>(), Ok(NegotiationStyle::Basic));
		assert_eq!("json".parse::<NegotiationStyle>(), Ok(NegotiationStyle::Json));
		assert!("mtls".parse::<NegotiationStyle>().is_err());
	}

	#[test]
	fn grant_parsing_defaults_expiry() {
		let grant = parse_grant(br#"{"access_token":"abc"}"#)
			.expect("Grant without expires_in should parse.");

		assert_eq!(grant.access_token, "abc");
		assert_eq!(grant.expires_in, 3_600);
	}

	#[test]
	fn grant_parsing_rejects_missing_access_token() {
		let err = parse_grant(br#"{"token_type":"bearer"}"#)
			.expect_err("Grant without access_token should fail.");

		assert!(matches!(err, Error::UpstreamAuth { .. }));
	}

	#[test]
	fn grant_parsing_rejects_malformed_json() {
		let err = parse_grant(b"<html>oops</html>")
			.expect_err("Non-JSON grant body should fail.");

		assert!(matches!(err, Error::TokenResponseParse(_)));
	}
}
