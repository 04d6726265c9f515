// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind},
};

/// Largest retry budget accepted from configuration.
pub const MAX_RETRY_BUDGET: u32 = 5;

/// Returns `true` for statuses worth retrying: rate limiting and gateway failures.
pub const fn is_transient_status(status: u16) -> bool {
	matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Bounded exponential backoff shared by token and resource calls.
///
/// Retry `n` (1-based) waits `initial_backoff * 2^(n - 1)`, or the provider's `Retry-After`
/// hint when one was sent, capped at `max_backoff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_retries: u32,
	/// Delay before the first retry.
	pub initial_backoff: Duration,
	/// Upper bound for any single delay.
	pub max_backoff: Duration,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub const fn none() -> Self {
		Self { max_retries: 0, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the first delay.
	pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
		self.initial_backoff = initial_backoff;

		self
	}

	/// Overrides the delay cap.
	pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
		self.max_backoff = max_backoff;

		self
	}

	/// Delay before retry number `retry` (1-based).
	pub fn backoff_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
		let delay = retry_after.unwrap_or_else(|| {
			let factor = 1_i32 << retry.saturating_sub(1).min(30);

			self.initial_backoff.checked_mul(factor).unwrap_or(self.max_backoff)
		});

		delay.min(self.max_backoff).max(Duration::ZERO)
	}

	/// Runs `operation` until it succeeds, fails permanently, or the budget is spent.
	///
	/// Only errors for which [`Error::is_retryable`] holds are retried.
	pub async fn run<T, F, Fut>(&self, kind: FlowKind, mut operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut retry = 0;

		loop {
			match operation().await {
				Err(e) if e.is_retryable() && retry < self.max_retries => {
					retry += 1;

					let hint = match &e {
						Error::TokenRequest(inner) => inner.retry_after(),
						_ => None,
					};

					self.pause(kind, retry, hint).await;
				},
				result => return result,
			}
		}
	}

	pub(crate) async fn pause(&self, kind: FlowKind, retry: u32, retry_after: Option<Duration>) {
		let delay = self.backoff_for(retry, retry_after);

		obs::emit_retry(kind, retry, delay);

		if delay.is_positive() {
			tokio::time::sleep(delay.unsigned_abs()).await;
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_backoff: Duration::seconds(1),
			max_backoff: Duration::seconds(30),
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;
	use crate::error::TokenRequestError;

	fn unavailable() -> Error {
		TokenRequestError::Status { status_code: 503, message: "unavailable".into(), retry_after: None }
			.into()
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.backoff_for(1, None), Duration::seconds(1));
		assert_eq!(policy.backoff_for(2, None), Duration::seconds(2));
		assert_eq!(policy.backoff_for(3, None), Duration::seconds(4));
		assert_eq!(policy.backoff_for(40, None), Duration::seconds(30));
		assert_eq!(policy.backoff_for(1, Some(Duration::seconds(9))), Duration::seconds(9));
		assert_eq!(policy.backoff_for(1, Some(Duration::hours(1))), Duration::seconds(30));
	}

	#[tokio::test]
	async fn transient_errors_are_retried_within_budget() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::none().with_max_retries(3);
		let result: Result<()> = policy
			.run(FlowKind::TokenRequest, || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(unavailable()) }
			})
			.await;

		assert!(matches!(result, Err(Error::TokenRequest(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn permanent_errors_stop_immediately() {
		let calls = AtomicU32::new(0);
		let result: Result<()> = RetryPolicy::none()
			.with_max_retries(3)
			.run(FlowKind::TokenRequest, || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(Error::SigningKeyMissing) }
			})
			.await;

		assert!(matches!(result, Err(Error::SigningKeyMissing)));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn recovery_returns_success() {
		let calls = AtomicU32::new(0);
		let value = RetryPolicy::none()
			.with_max_retries(3)
			.run(FlowKind::TokenRequest, || {
				let attempt = calls.fetch_add(1, Ordering::SeqCst);

				async move { if attempt < 2 { Err(unavailable()) } else { Ok(attempt) } }
			})
			.await
			.expect("Third attempt should succeed.");

		assert_eq!(value, 2);
	}
}
