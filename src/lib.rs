//! Authorization, rate-limit pacing, and response caching core for Okta management API
//! clients.
//!
//! Generated per-resource services build an [`ApiRequest`](client::ApiRequest) and hand it
//! to [`ApiClient::execute`](client::ApiClient::execute). The client then consults the
//! response cache, waits out exhausted rate-limit windows, authorizes the request under one
//! of the configured [`AuthorizationMode`](config::AuthorizationMode)s (including DPoP
//! token binding), and dispatches it under a bounded retry session.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod dpop;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod rate_limit;
pub mod retry;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use httpmock as _;

pub use crate::{
	client::{ApiClient, ApiRequest},
	config::{AuthorizationMode, ClientConfig},
	error::{Error, Result},
};
