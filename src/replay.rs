//! Single-use enforcement for assertion nonces (`jti`).

pub mod memory;

pub use memory::MemoryReplayStore;

// self
use crate::{_prelude::*, error::VerificationError};

/// Boxed future returned by [`ReplayStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Backend contract for remembering consumed nonces.
///
/// Implementations must make the check and the insert one atomic step: two concurrent calls with
/// the same `jti` produce exactly one [`ConsumeOutcome::Consumed`].
pub trait ReplayStore
where
	Self: Send + Sync,
{
	/// Records `jti` as consumed until `retain_until`, or reports that it already was.
	///
	/// `now` is the verifier's clock; entries retained past it must still count as consumed.
	fn check_and_consume<'a>(
		&'a self,
		jti: &'a str,
		retain_until: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, ConsumeOutcome>;
}

/// Result of a nonce check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumeOutcome {
	/// First sighting; the nonce is now recorded.
	Consumed,
	/// The nonce was recorded earlier and has not been evicted.
	Replayed,
}

/// Error type produced by [`ReplayStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure for the storage engine.
	#[error("Replay store failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Verifier-facing wrapper turning [`ConsumeOutcome::Replayed`] into an error.
#[derive(Clone)]
pub struct ReplayGuard {
	store: Arc<dyn ReplayStore>,
}
impl ReplayGuard {
	/// Wraps a shared store.
	pub fn new(store: Arc<dyn ReplayStore>) -> Self {
		Self { store }
	}

	/// Guard backed by a fresh [`MemoryReplayStore`].
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryReplayStore::default()))
	}

	/// Consumes `jti`, failing with [`VerificationError::ReplayDetected`] on a second sighting.
	pub async fn check_and_consume(
		&self,
		jti: &str,
		retain_until: OffsetDateTime,
		now: OffsetDateTime,
	) -> Result<()> {
		match self.store.check_and_consume(jti, retain_until, now).await? {
			ConsumeOutcome::Consumed => Ok(()),
			ConsumeOutcome::Replayed => Err(VerificationError::ReplayDetected.into()),
		}
	}
}
impl Debug for ReplayGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReplayGuard").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct FailingStore;
	impl ReplayStore for FailingStore {
		fn check_and_consume<'a>(
			&'a self,
			_: &'a str,
			_: OffsetDateTime,
			_: OffsetDateTime,
		) -> StoreFuture<'a, ConsumeOutcome> {
			Box::pin(async { Err(StoreError::Backend { message: "redis unreachable".into() }) })
		}
	}

	fn at(seconds: i64) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(1_700_000_000 + seconds)
			.expect("Timestamp fixture should be valid.")
	}

	#[tokio::test]
	async fn second_sighting_is_a_replay() {
		let guard = ReplayGuard::in_memory();

		guard.check_and_consume("nonce-1", at(300), at(0)).await.expect("First use should pass.");

		let err = guard
			.check_and_consume("nonce-1", at(300), at(1))
			.await
			.expect_err("Second use must be rejected.");

		assert!(matches!(err, Error::Verification(VerificationError::ReplayDetected)));
		guard.check_and_consume("nonce-2", at(300), at(1)).await.expect("Other nonces should pass.");
	}

	#[tokio::test]
	async fn store_failures_surface_as_storage_errors() {
		let err = ReplayGuard::new(Arc::new(FailingStore))
			.check_and_consume("nonce-1", at(300), at(0))
			.await
			.expect_err("Backend failure should propagate.");

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("redis unreachable"));
	}
}
