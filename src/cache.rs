//! Response cache contracts and built-in implementations for idempotent GET requests.

pub mod memory;

pub use memory::MemoryResponseCache;

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	http::{HttpRequest, HttpResponse},
};

/// Boxed future returned by [`ResponseCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage contract for cached GET responses.
pub trait ResponseCache
where
	Self: 'static + Send + Sync,
{
	/// Returns `true` if a live entry exists for `key`.
	fn has<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, bool>;

	/// Fetches the live entry for `key`, if any.
	fn get<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, Option<HttpResponse>>;

	/// Stores `response` under `key` for `ttl`.
	fn set(&self, key: Fingerprint, response: HttpResponse, ttl: StdDuration)
	-> CacheFuture<'_, ()>;

	/// Removes the entry for `key`. Missing keys are not an error.
	fn delete<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, ()>;

	/// Removes every entry.
	fn clear(&self) -> CacheFuture<'_, ()>;
}

/// Error type produced by [`ResponseCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Backend-level failure for the storage engine.
	#[error("Cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Canonical cache key for the read view of a request.
///
/// The method is normalized to `GET` so a write to a resource maps to the same key as the
/// read it invalidates. The key covers the full URL (query included) and the `Accept`
/// header, hashed with SHA-256 and encoded as URL-safe base64 without padding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);
impl Fingerprint {
	/// Computes the fingerprint of `request`.
	pub fn of(request: &HttpRequest) -> Self {
		let accept = request
			.headers
			.get(::http::header::ACCEPT)
			.map(HeaderValue::as_bytes)
			.unwrap_or_default();
		let mut hasher = Sha256::new();

		hasher.update(Method::GET.as_str().as_bytes());
		hasher.update(b"\n");
		hasher.update(request.url.as_str().as_bytes());
		hasher.update(b"\n");
		hasher.update(accept);

		Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
	}

	/// Returns the encoded key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Fingerprint {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Cache that never stores anything; used when caching is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;
impl ResponseCache for NoopCache {
	fn has<'a>(&'a self, _: &'a Fingerprint) -> CacheFuture<'a, bool> {
		Box::pin(async { Ok(false) })
	}

	fn get<'a>(&'a self, _: &'a Fingerprint) -> CacheFuture<'a, Option<HttpResponse>> {
		Box::pin(async { Ok(None) })
	}

	fn set(&self, _: Fingerprint, _: HttpResponse, _: StdDuration) -> CacheFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}

	fn delete<'a>(&'a self, _: &'a Fingerprint) -> CacheFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> CacheFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}
}
