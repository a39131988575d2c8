//! The request pipeline: cache, rate-limit gate, authorization, bounded dispatch.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::Authorize,
	cache::Fingerprint,
	client::{ApiClient, ApiRequest},
	http::{HttpRequest, HttpResponse},
	obs::{self, CacheLookup, OperationKind, OperationSpan, Outcome},
	rate_limit,
	retry::{Attempt, RetrySession},
};

/// Bytes of a throttled response body kept for diagnostics.
pub const BODY_PREVIEW_LIMIT: usize = 4 * 1024;

const REQUEST_ID_HEADER: &str = "x-okta-request-id";
const RETRY_FOR_HEADER: &str = "x-okta-retry-for";
const RETRY_COUNT_HEADER: &str = "x-okta-retry-count";

impl ApiClient {
	/// Executes `request`.
	///
	/// GET responses are served from and written to the response cache. Any other method
	/// evicts the cached read view of its URL before dispatch, whether or not the call
	/// succeeds. When the last observed quota is exhausted the call waits for the window to
	/// reset first. `429` responses are retried up to `max_retries` times, each after the
	/// server-dictated backoff clamped to `max_backoff`.
	///
	/// Non-2xx responses other than exhausted `429`s are returned as-is; use
	/// [`HttpResponse::error_for_status`] to turn them into errors.
	pub async fn execute(&self, request: ApiRequest, cancel: &CancellationToken) -> Result<HttpResponse> {
		let span = OperationSpan::api_request(&request.request.method, &request.request.url);

		obs::record_outcome(OperationKind::ApiRequest, Outcome::Attempt);

		let result = span.instrument(self.run_pipeline(request, &span, cancel)).await;
		let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };

		obs::record_outcome(OperationKind::ApiRequest, outcome);

		result
	}

	async fn run_pipeline(
		&self,
		request: ApiRequest,
		span: &OperationSpan,
		cancel: &CancellationToken,
	) -> Result<HttpResponse> {
		let ApiRequest { mut request, force_refresh } = request;
		let key = Fingerprint::of(&request);
		let is_get = request.method == Method::GET;
		let refresh = self.take_refresh_flag() || force_refresh;
		let lookup = if !is_get || refresh {
			self.response_cache.delete(&key).await?;

			CacheLookup::Bypass
		} else if let Some(hit) = self.response_cache.get(&key).await? {
			#[cfg(feature = "tracing")]
			tracing::debug!(url = request.url_without_query().as_str(), "Serving response from cache.");

			span.record_cache(CacheLookup::Hit);
			obs::record_cache_lookup(CacheLookup::Hit);

			return Ok(hit);
		} else {
			CacheLookup::Miss
		};

		span.record_cache(lookup);
		obs::record_cache_lookup(lookup);

		if self.config.rate_limit.enable {
			let waited = self.rate_limit.wait_for_reset(cancel).await?;

			if !waited.is_zero() {
				span.record_rate_limit_wait(waited);
				obs::record_rate_limit_wait(waited);
			}
		}

		self.prepare(&mut request, cancel).await?;

		let response = self.dispatch(request, cancel).await?;

		if is_get && response.is_success() {
			if self.config.rate_limit.enable {
				self.rate_limit.observe(&response);
			}

			let ttl = StdDuration::from_secs(self.config.cache.default_ttl);

			self.response_cache.set(key, response.clone(), ttl).await?;
		}

		Ok(response)
	}

	async fn prepare(&self, request: &mut HttpRequest, cancel: &CancellationToken) -> Result<()> {
		request.headers.insert(::http::header::USER_AGENT, self.user_agent.clone());

		self.authorization.authorize(&request.method, &request.url, &mut request.headers, cancel).await?;

		for (name, value) in &self.default_headers {
			request.headers.insert(name, value.clone());
		}

		Ok(())
	}

	async fn dispatch(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse> {
		let max_backoff = self.config.rate_limit.max_backoff;
		let pending = Mutex::new(request);
		let pending = &pending;

		RetrySession::new(
			OperationKind::ApiRequest,
			self.config.rate_limit.max_retries,
			StdDuration::ZERO,
			cancel,
		)
		.run(|attempt| async move {
			let request = pending.lock().clone();
			let response = match self.transport.send(request).await {
				Ok(response) => response,
				Err(e) if e.is_network() => return Attempt::retry(e),
				Err(e) => return Attempt::permanent(e),
			};

			if response.status != StatusCode::TOO_MANY_REQUESTS {
				return Attempt::Done(response);
			}

			let delay = match rate_limit::retry_delay(&response, max_backoff) {
				Ok(delay) => delay,
				Err(e) => return Attempt::permanent(e),
			};
			let retry_count = attempt + 1;

			#[cfg(feature = "tracing")]
			{
				let end = response.body.len().min(BODY_PREVIEW_LIMIT);

				tracing::debug!(
					retry_count,
					delay_s = delay.as_secs(),
					body = %String::from_utf8_lossy(&response.body[..end]),
					"Request throttled by the server."
				);
			}

			mark_retry(&mut pending.lock().headers, &response, retry_count);

			Attempt::retry_after(Error::TooManyRequests { attempts: retry_count }, delay)
		})
		.await
	}
}

fn mark_retry(headers: &mut HeaderMap, throttled: &HttpResponse, retry_count: u32) {
	if let Some(request_id) = throttled.headers.get(REQUEST_ID_HEADER) {
		headers.insert(RETRY_FOR_HEADER, request_id.clone());
	}

	headers.insert(RETRY_COUNT_HEADER, HeaderValue::from(retry_count));
}
