//! Server-imposed rate-limit tracking and 429 backoff computation.
//!
//! The management API reports quota state through `X-Rate-Limit-*` headers. The reset
//! header is an absolute server epoch, so every delay is computed against the response's
//! own `Date` header rather than the local clock:
//! `delay = X-Rate-Limit-Reset - Date + 1s`.

// std
use std::time::Duration as StdDuration;
// crates.io
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{_prelude::*, error::RateLimitError, http::HttpResponse, retry};

/// Request quota for the current window.
pub const HEADER_LIMIT: &str = "x-rate-limit-limit";
/// Requests left in the current window.
pub const HEADER_REMAINING: &str = "x-rate-limit-remaining";
/// Server epoch second at which the window resets.
pub const HEADER_RESET: &str = "x-rate-limit-reset";

const IMF_FIXDATE: &[BorrowedFormatItem<'_>] = format_description!(
	"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Most recent quota snapshot observed on a successful GET response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitState {
	/// Requests allowed in the window.
	pub limit: i64,
	/// Requests left in the window.
	pub remaining: i64,
	/// Server epoch second at which the window resets.
	pub reset: i64,
	/// Local instant after which the window has reset.
	pub reset_at: OffsetDateTime,
}
impl RateLimitState {
	/// Parses the quota headers of `response`, anchoring the reset to `now`.
	pub fn from_response(response: &HttpResponse, now: OffsetDateTime) -> Result<Self, RateLimitError> {
		let limit = integer_header(response, HEADER_LIMIT)?;
		let remaining = integer_header(response, HEADER_REMAINING)?;
		let reset = integer_header(response, HEADER_RESET)?;
		let delay = backoff_seconds(response)?;
		let reset_at = now
			.checked_add(Duration::seconds(delay))
			.ok_or(RateLimitError::InvalidHeader { header: HEADER_RESET })?;

		Ok(Self { limit, remaining, reset, reset_at })
	}

	/// Returns `true` when new requests must wait for the window to reset.
	pub fn is_exhausted(&self) -> bool {
		self.remaining <= 0
	}

	/// Time left until the window resets, measured from `now`.
	pub fn wait_from(&self, now: OffsetDateTime) -> StdDuration {
		to_std(self.reset_at - now)
	}
}

/// Per-client record of the latest quota state.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
	state: Mutex<Option<RateLimitState>>,
}
impl RateLimitTracker {
	/// Creates an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the latest recorded state.
	pub fn snapshot(&self) -> Option<RateLimitState> {
		*self.state.lock()
	}

	/// Replaces the recorded state with the quota headers of `response`.
	///
	/// Malformed headers leave the previous state untouched.
	pub fn observe(&self, response: &HttpResponse) -> Option<RateLimitState> {
		self.observe_at(response, OffsetDateTime::now_utc())
	}

	/// Same as [`Self::observe`] with an explicit local clock reading.
	pub fn observe_at(&self, response: &HttpResponse, now: OffsetDateTime) -> Option<RateLimitState> {
		let mut state = self.state.lock();

		match RateLimitState::from_response(response, now) {
			Ok(next) => {
				*state = Some(next);
			},
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::debug!(error = %_e, "Ignoring malformed rate-limit headers.");
			},
		}

		*state
	}

	/// Waits for the window to reset when the recorded quota is exhausted.
	///
	/// Returns the time spent waiting, zero when the quota had requests left.
	pub async fn wait_for_reset(&self, cancel: &CancellationToken) -> Result<StdDuration> {
		let Some(state) = self.snapshot().filter(RateLimitState::is_exhausted) else {
			return Ok(StdDuration::ZERO);
		};
		let wait = state.wait_from(OffsetDateTime::now_utc());

		#[cfg(feature = "tracing")]
		tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate-limit quota exhausted; waiting for reset.");

		retry::pause(wait, cancel).await?;

		Ok(wait)
	}
}

/// Parses the `Date` header (IMF-fixdate).
pub fn response_date(response: &HttpResponse) -> Result<OffsetDateTime, RateLimitError> {
	let raw = response.header_str(::http::header::DATE.as_str()).ok_or(RateLimitError::InvalidDate)?;

	PrimitiveDateTime::parse(raw, IMF_FIXDATE)
		.map(PrimitiveDateTime::assume_utc)
		.map_err(|_| RateLimitError::InvalidDate)
}

/// Seconds until the server's window resets: `X-Rate-Limit-Reset - Date + 1`.
///
/// A reset epoch too far from the `Date` header to be represented is reported as an
/// invalid reset header.
pub fn backoff_seconds(response: &HttpResponse) -> Result<i64, RateLimitError> {
	let date = response_date(response)?;
	let reset = integer_header(response, HEADER_RESET)?;

	reset
		.checked_sub(date.unix_timestamp())
		.and_then(|delta| delta.checked_add(1))
		.ok_or(RateLimitError::InvalidHeader { header: HEADER_RESET })
}

/// Delay to apply after a 429 response, clamped to `max_backoff` seconds.
pub fn retry_delay(response: &HttpResponse, max_backoff: i64) -> Result<StdDuration, RateLimitError> {
	let seconds = backoff_seconds(response)?.min(max_backoff).max(0);

	Ok(StdDuration::from_secs(seconds.unsigned_abs()))
}

fn integer_header(response: &HttpResponse, header: &'static str) -> Result<i64, RateLimitError> {
	response
		.header_str(header)
		.and_then(|value| value.parse().ok())
		.ok_or(RateLimitError::InvalidHeader { header })
}

fn to_std(duration: Duration) -> StdDuration {
	if duration.is_positive() { duration.unsigned_abs() } else { StdDuration::ZERO }
}
