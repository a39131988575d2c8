// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{CacheLookup, OperationKind, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(kind: OperationKind, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"okta_admin_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how a request used the response cache.
pub fn record_cache_lookup(lookup: CacheLookup) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("okta_admin_cache_lookup_total", "result" => lookup.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = lookup;
	}
}

/// Records time spent waiting for an exhausted quota window to reset.
pub fn record_rate_limit_wait(waited: StdDuration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("okta_admin_rate_limit_wait_seconds").record(waited.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = waited;
	}
}

/// Records one `use_dpop_nonce` challenge answered during a token exchange.
pub fn record_nonce_challenge() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("okta_admin_dpop_nonce_challenge_total").increment(1);
	}
}

/// Records a scheduled retry via the global metrics recorder (when enabled).
pub fn record_retry(kind: OperationKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("okta_admin_retry_total", "operation" => kind.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = kind;
	}
}
