//! Error types shared by the sender, verifier, adapters, and orchestrators.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Messages never embed tokens, signed assertions, client secrets, or raw act claims.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Replay store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::replay::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Received assertion failed verification.
	#[error(transparent)]
	Verification(#[from] VerificationError),
	/// Token endpoint call failed.
	#[error(transparent)]
	TokenRequest(#[from] TokenRequestError),
	/// Protected resource call failed below the HTTP layer.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Act claim is missing its subject or carries malformed fields.
	#[error("Act claim is invalid: {reason}.")]
	InvalidClaim {
		/// Which constraint the claim violated.
		reason: String,
	},
	/// Assertion audience or lifetime is out of bounds.
	#[error("Assertion request is invalid: {reason}.")]
	InvalidAssertionRequest {
		/// Which constraint the request violated.
		reason: String,
	},
	/// Out-of-session signing was requested without a configured private key.
	#[error("No signing key is configured for out-of-session assertions.")]
	SigningKeyMissing,
	/// Session record carries no usable human identifier.
	#[error("Session record does not identify a human principal.")]
	MissingIdentity,
}
impl Error {
	pub(crate) fn invalid_claim(reason: impl Into<String>) -> Self {
		Self::InvalidClaim { reason: reason.into() }
	}

	pub(crate) fn invalid_assertion_request(reason: impl Into<String>) -> Self {
		Self::InvalidAssertionRequest { reason: reason.into() }
	}

	/// Returns `true` when retrying the same call may succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::TokenRequest(e) => e.is_transient(),
			Self::Transport(_) => true,
			_ => false,
		}
	}

	/// Returns `true` when the failure stems from caller input rather than the environment.
	pub fn is_caller_error(&self) -> bool {
		matches!(
			self,
			Self::Config(_)
				| Self::InvalidClaim { .. }
				| Self::InvalidAssertionRequest { .. }
				| Self::MissingIdentity
				| Self::Verification(_)
		)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token request body could not be serialized.
	#[error("Token request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),

	/// Required setting is absent.
	#[error("Required setting `{field}` is missing.")]
	MissingField {
		/// Setting name.
		field: &'static str,
	},
	/// Required setting is present but blank.
	#[error("Setting `{field}` must not be empty.")]
	EmptyField {
		/// Setting name.
		field: &'static str,
	},
	/// Setting is not a valid URL.
	#[error("Setting `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Setting name.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Setting holds a URL that does not use HTTPS.
	#[error("Setting `{field}` must use HTTPS.")]
	InsecureUrl {
		/// Setting name.
		field: &'static str,
	},
	/// Setting holds a value outside its accepted range.
	#[error("Setting `{field}` is invalid: {reason}.")]
	InvalidValue {
		/// Setting name.
		field: &'static str,
		/// Which constraint the value violated.
		reason: String,
	},
	/// Vendor name is not one of the supported providers.
	#[error("Vendor `{vendor}` is not supported.")]
	UnsupportedVendor {
		/// Vendor name as supplied.
		vendor: String,
	},
	/// Key file could not be read.
	#[error("Key file `{}` could not be read.", path.display())]
	KeyFile {
		/// Path of the key file.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Key material is not a usable RSA PEM key, or signing with it failed.
	#[error("RSA key material is invalid.")]
	InvalidKey {
		/// Underlying key parsing or signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidValue { field, reason: reason.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Reasons a received act assertion is rejected.
///
/// Variants carry no assertion material so they can be logged verbatim.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VerificationError {
	/// Assertion is not a three-segment compact JWS with a readable header.
	#[error("Assertion is malformed.")]
	MalformedAssertion,
	/// Signature does not verify against the trusted key, or the algorithm is not RS256.
	#[error("Assertion signature is invalid: {reason}.")]
	SignatureInvalid {
		/// Which check failed.
		reason: String,
	},
	/// Assertion `exp` has passed.
	#[error("Assertion expired at unix time {expired_at}.")]
	Expired {
		/// The `exp` claim, in unix seconds.
		expired_at: i64,
	},
	/// Assertion `aud` differs from the expected audience.
	#[error("Assertion audience does not match.")]
	AudienceMismatch,
	/// Assertion `iss` differs from the expected issuer.
	#[error("Assertion issuer does not match.")]
	IssuerMismatch,
	/// Assertion `jti` was already consumed.
	#[error("Assertion has already been used.")]
	ReplayDetected,
	/// Signed payload lacks or mangles a required claim.
	#[error("Assertion claims are malformed: {reason}.")]
	MalformedClaim {
		/// Which claim is affected.
		reason: String,
	},
}
impl VerificationError {
	pub(crate) fn signature_invalid(reason: impl Into<String>) -> Self {
		Self::SignatureInvalid { reason: reason.into() }
	}

	pub(crate) fn malformed_claim(reason: impl Into<String>) -> Self {
		Self::MalformedClaim { reason: reason.into() }
	}
}

/// Token endpoint failures, carrying the HTTP status whenever one was received.
#[derive(Debug, ThisError)]
pub enum TokenRequestError {
	/// Provider answered with a non-success status.
	#[error("Token endpoint returned status {status_code}: {message}.")]
	Status {
		/// HTTP status code.
		status_code: u16,
		/// OAuth error code or a fixed summary; never the raw body.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Request timed out.
	#[error("Token endpoint request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Network failure (DNS, TCP, TLS).
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// Provider answered with a success status but an unreadable body.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// HTTP status code, when available.
		status_code: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
	/// Transport reported an error that fits no other category.
	#[error("Token endpoint call failed: {message}.")]
	Unexpected {
		/// HTTP status code, when available.
		status_code: Option<u16>,
		/// Fixed summary of the failure.
		message: String,
	},
}
impl TokenRequestError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// HTTP status code observed for the failed call, if any.
	pub fn status_code(&self) -> Option<u16> {
		match self {
			Self::Status { status_code, .. } => Some(*status_code),
			Self::Parse { status_code, .. } | Self::Unexpected { status_code, .. } => *status_code,
			_ => None,
		}
	}

	/// Retry-After hint supplied by the provider, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Status { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Returns `true` for rate limits, gateway failures, timeouts, and network errors.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Status { status_code, .. } => crate::http::is_transient_status(*status_code),
			Self::Timeout { .. } | Self::Network { .. } => true,
			_ => false,
		}
	}
}

/// Protected resource transport failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the protected resource.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
