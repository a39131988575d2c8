//! Bounded fixed-delay retry sessions.
//!
//! A [`RetrySession`] is created fresh for each outbound call and never shared. The
//! operation reports an [`Attempt`] per dispatch; the session decides whether to wait and
//! try again, racing every wait against the caller's [`CancellationToken`].

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	obs::{self, OperationKind},
};

/// Outcome of a single attempt, as classified by the operation.
#[derive(Debug)]
pub enum Attempt<T> {
	/// The attempt produced a final value.
	Done(T),
	/// The attempt failed in a way another attempt may fix.
	Retry {
		/// Error surfaced if no attempts remain.
		error: Error,
		/// Replacement delay before the next attempt; `None` keeps the current delay.
		delay: Option<StdDuration>,
	},
	/// The attempt failed permanently.
	Permanent(Error),
}
impl<T> Attempt<T> {
	/// Retries after the session's current delay.
	pub fn retry(error: impl Into<Error>) -> Self {
		Self::Retry { error: error.into(), delay: None }
	}

	/// Retries after `delay`.
	pub fn retry_after(error: impl Into<Error>, delay: StdDuration) -> Self {
		Self::Retry { error: error.into(), delay: Some(delay) }
	}

	/// Gives up immediately with `error`.
	pub fn permanent(error: impl Into<Error>) -> Self {
		Self::Permanent(error.into())
	}
}

/// Per-call retry state.
#[derive(Debug)]
pub struct RetrySession<'a> {
	operation: OperationKind,
	attempts: u32,
	max_retries: u32,
	delay: StdDuration,
	cancel: &'a CancellationToken,
}
impl<'a> RetrySession<'a> {
	/// Creates a session allowing `max_retries` retries after the first attempt.
	pub fn new(
		operation: OperationKind,
		max_retries: u32,
		delay: StdDuration,
		cancel: &'a CancellationToken,
	) -> Self {
		Self { operation, attempts: 0, max_retries, delay, cancel }
	}

	/// Number of retries consumed so far.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Delay applied before the next retry.
	pub fn current_delay(&self) -> StdDuration {
		self.delay
	}

	/// Drives `op` until it completes, fails permanently, or runs out of retries.
	///
	/// `op` receives the zero-based attempt number. When retries are exhausted the error
	/// from the last attempt is returned unchanged.
	pub async fn run<T, F, Fut>(mut self, mut op: F) -> Result<T>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Attempt<T>>,
	{
		loop {
			if self.cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			let (error, delay) = match op(self.attempts).await {
				Attempt::Done(value) => return Ok(value),
				Attempt::Permanent(error) => return Err(error),
				Attempt::Retry { error, delay } => (error, delay),
			};

			self.attempts += 1;

			if self.attempts > self.max_retries {
				return Err(error);
			}
			if let Some(delay) = delay {
				self.delay = delay;
			}

			obs::record_retry(self.operation);

			#[cfg(feature = "tracing")]
			tracing::debug!(
				operation = self.operation.as_str(),
				attempt = self.attempts,
				delay_ms = self.delay.as_millis() as u64,
				error = %error,
				"Retrying after a transient failure."
			);

			pause(self.delay, self.cancel).await?;
		}
	}
}

/// Sleeps for `duration` unless `cancel` fires first.
pub(crate) async fn pause(duration: StdDuration, cancel: &CancellationToken) -> Result<()> {
	if duration.is_zero() {
		return if cancel.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) };
	}

	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Cancelled),
		_ = tokio::time::sleep(duration) => Ok(()),
	}
}
