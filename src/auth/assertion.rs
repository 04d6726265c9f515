//! Payload and request bounds for signed act assertions.

// self
use crate::{_prelude::*, auth::ActClaim};

/// Issuer stamped on assertions signed by the application itself.
pub const APPLICATION_ISSUER: &str = "application";
/// Lifetime used when callers do not pick one.
pub const DEFAULT_ASSERTION_TTL: Duration = Duration::seconds(60);
/// Upper bound accepted for assertion lifetimes unless a sender overrides it.
pub const MAX_ASSERTION_TTL: Duration = Duration::seconds(300);

/// Claims carried by an out-of-session act assertion.
///
/// `jti` is always populated by the sender; receivers tolerate its absence but then skip the
/// replay check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssertionClaims {
	/// Signer identity.
	pub iss: String,
	/// Issuer marker for application assertions; the agent for provider-bound ones.
	pub sub: String,
	/// Intended receiver.
	pub aud: String,
	/// Issue time, unix seconds.
	pub iat: i64,
	/// Expiry, unix seconds.
	pub exp: i64,
	/// Unique nonce.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jti: Option<String>,
	/// Human principal.
	pub act: ActClaim,
}

/// Validated audience and lifetime for one assertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionRequest {
	audience: String,
	ttl: Duration,
}
impl AssertionRequest {
	/// Validates `audience` and `ttl_seconds` against [`MAX_ASSERTION_TTL`].
	pub fn new(audience: impl Into<String>, ttl_seconds: i64) -> Result<Self> {
		Self::bounded(audience, ttl_seconds, MAX_ASSERTION_TTL)
	}

	/// Validates `audience` and `ttl_seconds` against a caller-supplied maximum.
	///
	/// The audience must be an absolute HTTPS URL; the lifetime must be positive and no longer
	/// than `max_ttl`.
	pub fn bounded(audience: impl Into<String>, ttl_seconds: i64, max_ttl: Duration) -> Result<Self> {
		let audience = audience.into();
		let url = Url::parse(&audience)
			.map_err(|_| Error::invalid_assertion_request("audience is not an absolute URL"))?;

		if url.scheme() != "https" {
			return Err(Error::invalid_assertion_request("audience must use https"));
		}
		if ttl_seconds <= 0 {
			return Err(Error::invalid_assertion_request("ttl must be positive"));
		}

		let ttl = Duration::seconds(ttl_seconds);

		if ttl > max_ttl {
			return Err(Error::invalid_assertion_request(format!(
				"ttl exceeds {} seconds",
				max_ttl.whole_seconds()
			)));
		}

		Ok(Self { audience, ttl })
	}

	/// Intended receiver, exactly as supplied.
	pub fn audience(&self) -> &str {
		&self.audience
	}

	/// Assertion lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Builds the claims for an assertion issued at `issued_at`.
	pub fn claims(
		&self,
		issuer: &str,
		subject: &str,
		act: &ActClaim,
		issued_at: OffsetDateTime,
		jti: String,
	) -> AssertionClaims {
		let iat = issued_at.unix_timestamp();

		AssertionClaims {
			iss: issuer.to_owned(),
			sub: subject.to_owned(),
			aud: self.audience.clone(),
			iat,
			exp: iat + self.ttl.whole_seconds(),
			jti: Some(jti),
			act: act.clone(),
		}
	}
}
