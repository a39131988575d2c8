//! Transport primitives for management API calls and token exchanges.
//!
//! The module exposes [`HttpTransport`] alongside the buffered [`HttpRequest`] and
//! [`HttpResponse`] models so callers can plug in custom HTTP stacks. Implementations must
//! report network-layer failures (reset connections, EOF, timeouts) as
//! [`TransportError::Network`] and everything else as [`TransportError::Request`]; the
//! retry layer relies on that split to decide what is worth another attempt.

// std
use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::Proxy;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a buffered request.
///
/// The trait is the client's only dependency on an HTTP implementation. Implementations
/// must be `Send + Sync + 'static` so they can be shared across clones of
/// [`ApiClient`](crate::client::ApiClient) and across concurrently in-flight calls.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Fully buffered outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL including the query string.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Returns the target URL with the query string and fragment removed.
	pub fn url_without_query(&self) -> Url {
		strip_query(&self.url)
	}
}

/// Fully buffered response. Cheap enough to clone into the response cache.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns a header value as a trimmed string, if present and visible ASCII.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim)
	}

	/// Lossily decodes the body as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the JSON body, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Converts non-2xx responses into [`Error::Api`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Api { status: self.status.as_u16(), body: self.text() })
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the request timeout and proxy settings of `config`.
	pub fn from_config(config: &ClientConfig) -> Result<Self> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.request_timeout {
			builder = builder.timeout(std::time::Duration::from_secs(timeout));
		}
		if let Some(proxy) = config.proxy.as_ref().filter(|proxy| !proxy.host.is_empty()) {
			let mut upstream = Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))
				.map_err(ConfigError::from)?;

			if let Some(username) = &proxy.username {
				upstream =
					upstream.basic_auth(username, proxy.password.as_deref().unwrap_or_default());
			}

			builder = builder.proxy(upstream);
		}

		Ok(Self(builder.build().map_err(ConfigError::from)?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let target = request.url_without_query().to_string();
			let mut builder =
				client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|err| map_reqwest_error(&target, err))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|err| map_reqwest_error(&target, err))?;

			Ok(HttpResponse::new(status, headers, body.to_vec()))
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(target: &str, err: ReqwestError) -> TransportError {
	if err.is_builder() || err.is_redirect() {
		return TransportError::request(target, err);
	}
	if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() || err.is_decode()
	{
		return TransportError::network(target, err);
	}

	TransportError::request(target, err)
}

/// Removes the query string and fragment from `url`.
pub(crate) fn strip_query(url: &Url) -> Url {
	let mut bare = url.clone();

	bare.set_query(None);
	bare.set_fragment(None);

	bare
}
