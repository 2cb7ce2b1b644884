//! Process configuration: the immutable upstream credential store plus service
//! settings, sourced from environment variables once at startup.

// std
use std::net::SocketAddr;
// self
use crate::{_prelude::*, negotiate::NegotiationStyle};

/// Errors raised while assembling [`Settings`] from the environment.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or empty.
	#[error("Environment variable `{key}` is required.")]
	MissingVar {
		/// Variable name.
		key: &'static str,
	},
	/// An environment variable failed to parse.
	#[error("Environment variable `{key}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name.
		key: &'static str,
		/// Parse failure description.
		reason: String,
	},
	/// The shared HTTP transport could not be constructed.
	#[error("HTTP client could not be constructed: {reason}.")]
	HttpClient {
		/// Underlying transport builder failure.
		reason: String,
	},
}

/// How the bridge authenticates to the upstream booking API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
	#[default]
	/// OAuth2 client-credentials bearer tokens via the token cache.
	Bearer,
	/// Static tenant API key sent as `x-api-key`.
	StaticKey,
}

/// Immutable upstream credential store; created once, never mutated.
#[derive(Clone, Debug)]
pub struct UpstreamCredentials {
	/// Upstream REST base URL (no trailing slash).
	pub base_url: Url,
	/// Selected outbound auth mode.
	pub auth_mode: AuthMode,
	/// OAuth2 token endpoint, required in bearer mode.
	pub token_url: Option<Url>,
	/// OAuth2 client identifier, required in bearer mode.
	pub client_id: Option<String>,
	/// OAuth2 client secret, required in bearer mode.
	pub client_secret: Option<String>,
	/// Static tenant key, required in static-key mode.
	pub static_api_key: Option<String>,
	/// Negotiation style attempted first during token exchanges.
	pub preferred_style: NegotiationStyle,
	/// Optional OAuth2 `scope` parameter forwarded on every exchange.
	pub scope: Option<String>,
	/// Optional OAuth2 `audience` parameter forwarded on every exchange.
	pub audience: Option<String>,
}
impl UpstreamCredentials {
	/// Joins a path onto the base URL.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
	}
}

/// Catalog cache knobs.
#[derive(Clone, Debug)]
pub struct CatalogSettings {
	/// Upstream products path appended to the base URL.
	pub path: String,
	/// Snapshot time-to-live.
	pub ttl: Duration,
	/// Optional case-insensitive substring filter applied to product names.
	pub name_filter: Option<String>,
}
impl Default for CatalogSettings {
	fn default() -> Self {
		Self { path: "/products".into(), ttl: Duration::seconds(600), name_filter: None }
	}
}

/// Availability lookup cache knobs.
#[derive(Clone, Debug)]
pub struct AvailabilitySettings {
	/// Upstream availability path appended to the base URL.
	pub path: String,
	/// Cached-response time-to-live.
	pub ttl: Duration,
}
impl Default for AvailabilitySettings {
	fn default() -> Self {
		Self { path: "/product-availability".into(), ttl: Duration::seconds(300) }
	}
}

/// Full service configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
	/// Inbound listen address.
	pub bind_addr: SocketAddr,
	/// Shared secret expected in `X-API-Key`; `None` disables the check.
	pub shared_key: Option<String>,
	/// HMAC secret for webhook signatures; `None` disables verification.
	pub webhook_secret: Option<String>,
	/// Upstream credential store.
	pub upstream: UpstreamCredentials,
	/// Catalog cache settings.
	pub catalog: CatalogSettings,
	/// Availability cache settings.
	pub availability: AvailabilitySettings,
}
impl Settings {
	/// Assembles settings from environment variables.
	///
	/// Recognized variables mirror the deployment surface: `BRIDGE_BIND`,
	/// `MW_API_KEY`, `ROLLER_BASE_URL`, `ROLLER_AUTH_TYPE` (`oauth`|`key`),
	/// `ROLLER_TOKEN_URL`, `ROLLER_CLIENT_ID`, `ROLLER_CLIENT_SECRET`,
	/// `ROLLER_API_KEY`, `ROLLER_TOKEN_STYLE` (`basic`|`body`|`json`),
	/// `ROLLER_OAUTH_SCOPE`, `ROLLER_OAUTH_AUDIENCE`, `ROLLER_PRODUCTS_PATH`,
	/// `CATALOG_TTL_SECONDS`, `CATALOG_NAME_FILTER`, `ROLLER_AVAILABILITY_PATH`,
	/// `AVAIL_TTL_SECONDS`, `ROLLER_WEBHOOK_SECRET`.
	pub fn from_env() -> Result<Self, ConfigError> {
		let bind_addr = env_or("BRIDGE_BIND", "0.0.0.0:8080")
			.parse()
			.map_err(|e| invalid("BRIDGE_BIND", e))?;
		let base_url = env_opt("ROLLER_BASE_URL")
			.ok_or(ConfigError::MissingVar { key: "ROLLER_BASE_URL" })?;
		let base_url = Url::parse(&base_url).map_err(|e| invalid("ROLLER_BASE_URL", e))?;
		let auth_mode = match env_or("ROLLER_AUTH_TYPE", "oauth").to_ascii_lowercase().as_str() {
			"oauth" => AuthMode::Bearer,
			"key" => AuthMode::StaticKey,
			other => return Err(invalid("ROLLER_AUTH_TYPE", format!("unknown mode `{other}`"))),
		};
		let token_url = env_opt("ROLLER_TOKEN_URL")
			.map(|raw| Url::parse(&raw).map_err(|e| invalid("ROLLER_TOKEN_URL", e)))
			.transpose()?;
		let preferred_style = env_or("ROLLER_TOKEN_STYLE", "basic")
			.parse()
			.map_err(|e: String| invalid("ROLLER_TOKEN_STYLE", e))?;
		let upstream = UpstreamCredentials {
			base_url,
			auth_mode,
			token_url,
			client_id: env_opt("ROLLER_CLIENT_ID"),
			client_secret: env_opt("ROLLER_CLIENT_SECRET"),
			static_api_key: env_opt("ROLLER_API_KEY"),
			preferred_style,
			scope: env_opt("ROLLER_OAUTH_SCOPE"),
			audience: env_opt("ROLLER_OAUTH_AUDIENCE"),
		};
		let catalog = CatalogSettings {
			path: env_or("ROLLER_PRODUCTS_PATH", "/products"),
			ttl: env_seconds("CATALOG_TTL_SECONDS", 600)?,
			name_filter: env_opt("CATALOG_NAME_FILTER").map(|f| f.to_lowercase()),
		};
		let availability = AvailabilitySettings {
			path: env_or("ROLLER_AVAILABILITY_PATH", "/product-availability"),
			ttl: env_seconds("AVAIL_TTL_SECONDS", 300)?,
		};

		Ok(Self {
			bind_addr,
			shared_key: env_opt("MW_API_KEY"),
			webhook_secret: env_opt("ROLLER_WEBHOOK_SECRET"),
			upstream,
			catalog,
			availability,
		})
	}
}

fn env_opt(key: &'static str) -> Option<String> {
	std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_or(key: &'static str, default: &str) -> String {
	env_opt(key).unwrap_or_else(|| default.into())
}

fn env_seconds(key: &'static str, default: i64) -> Result<Duration, ConfigError> {
	match env_opt(key) {
		None => Ok(Duration::seconds(default)),
		Some(raw) =>
			raw.parse().map(Duration::seconds).map_err(|e| invalid(key, format!("{e}"))),
	}
}

fn invalid(key: &'static str, reason: impl ToString) -> ConfigError {
	ConfigError::InvalidVar { key, reason: reason.to_string() }
}
