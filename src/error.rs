//! Bridge-level error taxonomy shared across the token, catalog, and proxy layers.

// self
use crate::_prelude::*;

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Maximum number of characters of upstream body text carried in diagnostics.
pub const BODY_PREVIEW_LIMIT: usize = 600;

/// Canonical bridge error exposed by handlers and the upstream client.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Required credentials are missing from the local configuration.
	#[error("Auth configuration is incomplete: {reason}.")]
	AuthConfig {
		/// Names the missing or inconsistent credential fields.
		reason: String,
	},
	/// Every token negotiation style was rejected by the token endpoint.
	#[error("Token negotiation failed: {detail}.")]
	UpstreamAuth {
		/// Last response body or network error text, truncated for diagnostics.
		detail: String,
	},
	/// Token endpoint answered 200 with a body the grant parser could not read.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Upstream call failed with a non-2xx status or a network error.
	#[error("Upstream {context} call failed: {detail}.")]
	Upstream {
		/// Short label for the upstream operation (e.g., `catalog fetch`).
		context: &'static str,
		/// HTTP status code returned by upstream, when the call got that far.
		status: Option<u16>,
		/// Truncated upstream body or network error text.
		detail: String,
	},
	/// Inbound request carried malformed input.
	#[error("{reason}.")]
	Validation {
		/// Human-readable description of the malformed field.
		reason: String,
	},
	/// Shared-secret check failed.
	#[error("Unauthorized: bad X-API-Key.")]
	Unauthorized,
}
impl Error {
	/// Builds an [`Error::AuthConfig`] from a reason string.
	pub fn auth_config(reason: impl Into<String>) -> Self {
		Self::AuthConfig { reason: reason.into() }
	}

	/// Builds an [`Error::UpstreamAuth`] with a truncated diagnostic.
	pub fn upstream_auth(detail: impl Into<String>) -> Self {
		Self::UpstreamAuth { detail: truncate_preview(detail.into()) }
	}

	/// Builds an [`Error::Upstream`] with a truncated diagnostic.
	pub fn upstream(context: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
		Self::Upstream { context, status, detail: truncate_preview(detail.into()) }
	}

	/// Builds an [`Error::Validation`] from a reason string.
	pub fn validation(reason: impl Into<String>) -> Self {
		Self::Validation { reason: reason.into() }
	}
}

/// Truncates upstream body text to [`BODY_PREVIEW_LIMIT`] characters.
pub fn truncate_preview(body: String) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn truncate_preview_caps_long_bodies() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 50);
		let truncated = truncate_preview(long);

		assert_eq!(truncated.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(truncated.ends_with('…'));
	}

	#[test]
	fn truncate_preview_keeps_short_bodies() {
		assert_eq!(truncate_preview("short".into()), "short");
	}
}
