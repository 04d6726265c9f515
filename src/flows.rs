//! Session orchestrators composing the sender, the verifier, and a vendor adapter.
//!
//! In-session callers already hold the human's session; out-of-session callers receive a signed
//! assertion across a network hop. Both end in the same [`NormalizedTokenResult`](crate::auth::NormalizedTokenResult).

mod in_session;
mod out_of_session;

pub use in_session::*;
pub use out_of_session::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ScopeValidationError},
};

/// Rejects empty scope requests before any assertion is consumed or provider contacted.
pub(crate) fn require_scopes(scopes: &ScopeSet) -> Result<()> {
	if scopes.is_empty() {
		return Err(ScopeValidationError::Missing.into());
	}

	Ok(())
}
