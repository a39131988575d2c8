//! Optional observability helpers for token exchanges and API requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit an `okta_admin.request` span per API call (fields `method`,
//!   `path`, `cache` and `rate_limit_wait_ms`) and an `okta_admin.token_exchange` span per
//!   client credentials exchange (fields `token_url`, `dpop` and `nonce_challenges`).
//! - Enable `metrics` to record:
//!   - `okta_admin_operation_total{operation,outcome}` per attempt/success/failure.
//!   - `okta_admin_cache_lookup_total{result}` per GET, labeled `hit`, `miss` or `bypass`.
//!   - `okta_admin_rate_limit_wait_seconds`, a histogram of pre-dispatch quota waits.
//!   - `okta_admin_dpop_nonce_challenge_total` per `use_dpop_nonce` answer.
//!   - `okta_admin_retry_total{operation}` per scheduled retry.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Client credentials exchange against the token endpoint.
	TokenExchange,
	/// Management API request dispatched by the executor.
	ApiRequest,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::TokenExchange => "token_exchange",
			OperationKind::ApiRequest => "api_request",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}

/// Result of consulting the response cache for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLookup {
	/// Served from the cache without dispatching.
	Hit,
	/// GET with no live entry; dispatched and stored.
	Miss,
	/// Write or refresh request that evicted the entry instead of reading it.
	Bypass,
}
impl CacheLookup {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheLookup::Hit => "hit",
			CacheLookup::Miss => "miss",
			CacheLookup::Bypass => "bypass",
		}
	}
}
