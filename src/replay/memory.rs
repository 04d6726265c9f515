//! Process-local [`ReplayStore`] for single-instance agents and tests.

// self
use crate::{
	_prelude::*,
	replay::{ConsumeOutcome, ReplayStore, StoreError, StoreFuture},
};

type NonceMap = Arc<Mutex<HashMap<String, OffsetDateTime>>>;

/// Thread-safe nonce set keyed by `jti`, each entry kept until its retention instant.
///
/// Expired entries are swept on every insert, so memory stays proportional to the number of
/// assertions still inside their validity window.
#[derive(Clone, Debug, Default)]
pub struct MemoryReplayStore(NonceMap);
impl MemoryReplayStore {
	/// Atomic check-and-insert evaluated against `now`.
	pub fn check_and_consume_at(
		&self,
		jti: &str,
		retain_until: OffsetDateTime,
		now: OffsetDateTime,
	) -> ConsumeOutcome {
		let mut guard = self.0.lock();

		Self::sweep(&mut guard, now);

		if guard.contains_key(jti) {
			return ConsumeOutcome::Replayed;
		}

		guard.insert(jti.to_owned(), retain_until);

		ConsumeOutcome::Consumed
	}

	/// Drops entries whose retention instant has passed; returns how many were removed.
	pub fn purge_expired_at(&self, now: OffsetDateTime) -> usize {
		let mut guard = self.0.lock();
		let before = guard.len();

		Self::sweep(&mut guard, now);

		before - guard.len()
	}

	/// Number of nonces currently retained.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no nonce is retained.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	fn sweep(map: &mut HashMap<String, OffsetDateTime>, now: OffsetDateTime) {
		map.retain(|_, until| *until > now);
	}
}
impl ReplayStore for MemoryReplayStore {
	fn check_and_consume<'a>(
		&'a self,
		jti: &'a str,
		retain_until: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, ConsumeOutcome> {
		let outcome = self.check_and_consume_at(jti, retain_until, now);

		Box::pin(async move { Ok::<_, StoreError>(outcome) })
	}
}
