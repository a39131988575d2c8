//! Management API client facade shared by generated resource services.

mod execute;

pub use execute::BODY_PREVIEW_LIMIT;

// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::Authorization,
	cache::{MemoryResponseCache, NoopCache, ResponseCache},
	config::ClientConfig,
	error::ConfigError,
	http::{HttpRequest, HttpTransport},
	rate_limit::{RateLimitState, RateLimitTracker},
	store::TokenCache,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// One outbound management API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// Buffered request; authorization headers are added by the client.
	pub request: HttpRequest,
	/// Bypasses and evicts the cached response for this request.
	pub force_refresh: bool,
}
impl ApiRequest {
	/// Creates a request accepting JSON.
	pub fn new(method: Method, url: Url) -> Self {
		let mut request = HttpRequest::new(method, url);

		request.headers.insert(::http::header::ACCEPT, HeaderValue::from_static("application/json"));

		Self { request, force_refresh: false }
	}

	/// Sets a request header, replacing any previous value.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.request.headers.insert(name, value);

		self
	}

	/// Sets a raw request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.request.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON request body.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		self.request.body = Some(serde_json::to_vec(payload)?);
		self.request
			.headers
			.insert(::http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Skips the response cache for this request and evicts any stale entry.
	pub fn force_refresh(mut self) -> Self {
		self.force_refresh = true;

		self
	}
}

/// Authorizes, paces, caches, and dispatches management API requests.
///
/// Cloning is cheap: clones share the transport, the credential cache, the response cache,
/// and the rate-limit tracker, so quota observations and issued tokens are visible to every
/// clone.
#[derive(Clone)]
pub struct ApiClient {
	/// Validated client configuration.
	pub config: Arc<ClientConfig>,
	/// Normalized organization URL.
	pub org_url: Url,
	/// Transport used for API calls and token exchanges.
	pub transport: Arc<dyn HttpTransport>,
	/// Authorization strategy selected by the configuration.
	pub authorization: Arc<Authorization>,
	/// Credential cache shared with the authorization strategy.
	pub token_cache: Arc<TokenCache>,
	/// Response cache for GET requests.
	pub response_cache: Arc<dyn ResponseCache>,
	/// Latest quota state reported by the server.
	pub rate_limit: Arc<RateLimitTracker>,
	user_agent: HeaderValue,
	default_headers: HeaderMap,
	refresh_next: Arc<AtomicBool>,
}
impl ApiClient {
	/// Builds a client from `config` on top of a caller-provided transport.
	///
	/// The configuration is validated and key material parsed here, so every
	/// configuration problem surfaces before the first request.
	pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
		let org_url = config.validate()?;
		let token_cache = Arc::new(TokenCache::new());
		let authorization =
			Authorization::from_config(&config, &org_url, transport.clone(), token_cache.clone())?;
		let response_cache: Arc<dyn ResponseCache> = if config.cache.enabled {
			Arc::new(MemoryResponseCache::new(StdDuration::from_secs(config.cache.cleanup_interval)))
		} else {
			Arc::new(NoopCache)
		};
		let user_agent = HeaderValue::from_str(&config.user_agent())
			.map_err(|_| ConfigError::InvalidHeader { name: "User-Agent".into() })?;
		let default_headers = config.default_header_map()?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			org_url = org_url.as_str(),
			mode = config.authorization_mode.as_str(),
			cache = config.cache.enabled,
			"Management API client constructed."
		);

		Ok(Self {
			config: Arc::new(config),
			org_url,
			transport,
			authorization: Arc::new(authorization),
			token_cache,
			response_cache,
			rate_limit: Default::default(),
			user_agent,
			default_headers,
			refresh_next: Default::default(),
		})
	}

	/// Replaces the response cache, e.g. with a shared or external backend.
	pub fn with_response_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
		self.response_cache = cache;

		self
	}

	/// Resolves `path` against the organization URL.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(self.org_url.join(path)?)
	}

	/// Starts a request for `path` under the organization URL.
	pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		Ok(ApiRequest::new(method, self.endpoint(path)?))
	}

	/// Makes the next [`Self::execute`] call bypass the response cache.
	///
	/// The flag is consumed by exactly one call.
	pub fn refresh_next(&self) -> &Self {
		self.refresh_next.store(true, Ordering::SeqCst);

		self
	}

	/// Drops the cached credential so the next request runs a fresh exchange.
	pub fn invalidate_credentials(&self) {
		self.token_cache.invalidate();
	}

	/// Latest quota state, if one has been observed.
	pub fn rate_limit_state(&self) -> Option<RateLimitState> {
		self.rate_limit.snapshot()
	}

	/// Clears every cached response.
	pub async fn clear_response_cache(&self) -> Result<()> {
		Ok(self.response_cache.clear().await?)
	}

	fn take_refresh_flag(&self) -> bool {
		self.refresh_next.swap(false, Ordering::SeqCst)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Builds a client from `config` with a reqwest transport honoring its timeout and proxy.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Self::with_transport(config, Arc::new(transport))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("org_url", &self.org_url.as_str())
			.field("authorization_mode", &self.config.authorization_mode)
			.field("cache_enabled", &self.config.cache.enabled)
			.field("rate_limit", &self.rate_limit.snapshot())
			.finish_non_exhaustive()
	}
}
