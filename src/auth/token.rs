//! Secret wrappers and the provider-independent token result.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Token type reported when the provider omits one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 3_600;

/// Redacted secret wrapper keeping tokens, assertions, and client secrets out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true if the secret is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Token result every vendor adapter returns, regardless of provider dialect.
///
/// `act_assertion` is populated only by hybrid-assertion providers; callers forward it to the
/// resource server next to the access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedTokenResult {
	/// Bearer access token.
	pub access_token: TokenSecret,
	/// Token type, `Bearer` unless the provider says otherwise.
	pub token_type: String,
	/// Lifetime in seconds, relative to `issued_at`.
	pub expires_in: u64,
	/// Granted scopes, or the requested ones when the provider does not echo them.
	pub scope: ScopeSet,
	/// Secondary signed act assertion for hybrid-assertion providers.
	pub act_assertion: Option<TokenSecret>,
	/// When the adapter received the token.
	pub issued_at: OffsetDateTime,
}
impl NormalizedTokenResult {
	/// Instant after which the access token should no longer be used.
	pub fn expires_at(&self) -> OffsetDateTime {
		let lifetime = Duration::seconds(i64::try_from(self.expires_in).unwrap_or(i64::MAX));

		self.issued_at
			.checked_add(lifetime)
			.unwrap_or_else(|| time::PrimitiveDateTime::MAX.assume_utc())
	}

	/// Returns true once `instant` reaches [`expires_at`](Self::expires_at).
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn result() -> NormalizedTokenResult {
		NormalizedTokenResult {
			access_token: TokenSecret::new("access-123"),
			token_type: DEFAULT_TOKEN_TYPE.into(),
			expires_in: 300,
			scope: ScopeSet::new(["read"]).expect("Scope fixture should be valid."),
			act_assertion: Some(TokenSecret::new("header.payload.signature")),
			issued_at: datetime!(2025-01-01 00:00:00 UTC),
		}
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn debug_never_prints_tokens() {
		let rendered = format!("{:?}", result());

		assert!(!rendered.contains("access-123"));
		assert!(!rendered.contains("header.payload.signature"));
	}

	#[test]
	fn expiry_is_relative_to_issue_time() {
		let token = result();

		assert_eq!(token.expires_at(), datetime!(2025-01-01 00:05:00 UTC));
		assert!(!token.is_expired_at(datetime!(2025-01-01 00:04:59 UTC)));
		assert!(token.is_expired_at(datetime!(2025-01-01 00:05:00 UTC)));
	}
}
