// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, obs::CacheLookup};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// Span wrapper used around token exchanges and API requests.
///
/// Fields unknown when the span opens are declared empty and filled in through the
/// `record_*` methods.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Opens an `okta_admin.request` span for one API call.
	pub fn api_request(method: &Method, url: &Url) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"okta_admin.request",
				method = method.as_str(),
				path = url.path(),
				cache = tracing::field::Empty,
				rate_limit_wait_ms = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, url);

			Self {}
		}
	}

	/// Opens an `okta_admin.token_exchange` span for one client credentials exchange.
	pub fn token_exchange(token_url: &Url) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"okta_admin.token_exchange",
				token_url = token_url.as_str(),
				dpop = tracing::field::Empty,
				nonce_challenges = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = token_url;

			Self {}
		}
	}

	/// Records how the request used the response cache.
	pub fn record_cache(&self, lookup: CacheLookup) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("cache", lookup.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = lookup;
		}
	}

	/// Records the quota wait served before dispatch.
	pub fn record_rate_limit_wait(&self, waited: StdDuration) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("rate_limit_wait_ms", waited.as_millis() as u64);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = waited;
		}
	}

	/// Records whether the issued credential is DPoP-bound and how many nonces were answered.
	pub fn record_handshake(&self, dpop: bool, nonce_challenges: u32) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("dpop", dpop);
			self.span.record("nonce_challenges", nonce_challenges);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (dpop, nonce_challenges);
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
