//! Server-to-server middleware bridging a chat automation platform with the ROLLER
//! venue-booking API—tolerant OAuth2 client-credentials negotiation, single-slot token
//! caching, and fuzzy catalog resolution behind a thin HTTP proxy surface.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod obs;
pub mod token;
pub mod upstream;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as Json;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use {http_body_util as _, httpmock as _, tower as _};
