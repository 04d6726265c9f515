//! Agent-side recovery of act claims from out-of-session assertions.
//!
//! Checks run in a fixed order and nothing in the payload is read before the RS256 signature
//! holds: algorithm pin, signature, expiry, audience, issuer (when configured), nonce, then
//! the embedded `act` object.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	auth::{ActClaim, RawActClaim},
	error::{ConfigError, VerificationError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	redact::{self, ActSummary},
	replay::{ReplayGuard, ReplayStore},
};

/// Payload fields read after the signature is verified.
#[derive(Debug, Deserialize)]
struct WireClaims {
	#[serde(default)]
	iss: Option<String>,
	#[serde(default)]
	aud: Option<String>,
	exp: i64,
	#[serde(default)]
	jti: Option<String>,
	#[serde(default)]
	act: Option<RawActClaim>,
}

#[derive(Deserialize)]
struct WireHeader {
	alg: String,
}

/// Verifies signed act assertions against the application's public key.
///
/// The key is loaded once and held read-only. Clones share the replay store.
#[derive(Clone)]
pub struct OutOfSessionVerifier {
	decoding_key: DecodingKey,
	replay: ReplayGuard,
	expected_issuer: Option<String>,
	leeway: Duration,
}
impl OutOfSessionVerifier {
	/// Loads a PEM-encoded RSA public key (SPKI or PKCS#1).
	pub fn from_rsa_pem(pem: &[u8], store: Arc<dyn ReplayStore>) -> Result<Self> {
		let decoding_key =
			DecodingKey::from_rsa_pem(pem).map_err(|source| ConfigError::InvalidKey { source })?;

		Ok(Self {
			decoding_key,
			replay: ReplayGuard::new(store),
			expected_issuer: None,
			leeway: Duration::ZERO,
		})
	}

	/// Reads and loads a PEM-encoded RSA public key file.
	pub fn from_pem_file(path: impl AsRef<Path>, store: Arc<dyn ReplayStore>) -> Result<Self> {
		let path = path.as_ref();
		let pem = std::fs::read(path)
			.map_err(|source| ConfigError::KeyFile { path: path.to_path_buf(), source })?;

		Self::from_rsa_pem(&pem, store)
	}

	/// Additionally requires `iss` to equal `issuer`.
	pub fn with_expected_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.expected_issuer = Some(issuer.into());

		self
	}

	/// Tolerates clock skew of up to `leeway` past `exp`.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = leeway.max(Duration::ZERO);

		self
	}

	/// Verifies `assertion` at the current time and returns its act claim.
	pub async fn verify(&self, assertion: &str, expected_audience: &str) -> Result<ActClaim> {
		self.verify_at(assertion, expected_audience, OffsetDateTime::now_utc()).await
	}

	/// Verifies `assertion` as of `now`.
	///
	/// A nonce is consumed only after every cryptographic and temporal check has passed, so a
	/// rejected assertion never burns its `jti`.
	pub async fn verify_at(
		&self,
		assertion: &str,
		expected_audience: &str,
		now: OffsetDateTime,
	) -> Result<ActClaim> {
		let span = FlowSpan::new(FlowKind::AssertionVerification, "out_of_session");

		obs::record_flow_outcome(FlowKind::AssertionVerification, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let claims = self.authenticate(assertion)?;

				self.check_validity(&claims, expected_audience, now)?;

				if let Some(jti) = claims.jti.as_deref() {
					self.replay
						.check_and_consume(jti, self.retain_until(claims.exp)?, now)
						.await?;
				}

				let act = extract_act(claims.act)?;

				span.record_subject(&redact::sanitize_identifier(act.sub()));
				obs::emit_act_accepted(FlowKind::AssertionVerification, &ActSummary::from(&act));

				Ok::<_, Error>(act)
			})
			.await;

		obs::record_flow_result(FlowKind::AssertionVerification, &result);

		result
	}

	fn authenticate(&self, assertion: &str) -> Result<WireClaims, VerificationError> {
		pin_algorithm(assertion)?;

		let mut validation = Validation::new(Algorithm::RS256);

		// Expiry and audience are checked by hand to keep their error variants distinct.
		validation.validate_exp = false;
		validation.validate_aud = false;

		jsonwebtoken::decode::<WireClaims>(assertion, &self.decoding_key, &validation)
			.map(|data| data.claims)
			.map_err(|e| map_decode_error(e.kind()))
	}

	fn check_validity(
		&self,
		claims: &WireClaims,
		expected_audience: &str,
		now: OffsetDateTime,
	) -> Result<(), VerificationError> {
		let deadline = claims.exp.saturating_add(self.leeway.whole_seconds());

		if now.unix_timestamp() > deadline {
			return Err(VerificationError::Expired { expired_at: claims.exp });
		}
		if claims.aud.as_deref() != Some(expected_audience) {
			return Err(VerificationError::AudienceMismatch);
		}
		if let Some(expected) = self.expected_issuer.as_deref()
			&& claims.iss.as_deref() != Some(expected)
		{
			return Err(VerificationError::IssuerMismatch);
		}

		Ok(())
	}

	/// Nonces stay recorded one second past the last instant the assertion could verify.
	fn retain_until(&self, exp: i64) -> Result<OffsetDateTime, VerificationError> {
		let last_valid = exp.saturating_add(self.leeway.whole_seconds()).saturating_add(1);

		OffsetDateTime::from_unix_timestamp(last_valid)
			.map_err(|_| VerificationError::malformed_claim("exp is out of range"))
	}
}
impl Debug for OutOfSessionVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OutOfSessionVerifier")
			.field("expected_issuer", &self.expected_issuer)
			.field("leeway", &self.leeway)
			.finish_non_exhaustive()
	}
}

/// Rejects anything but RS256 before the library sees the header.
fn pin_algorithm(assertion: &str) -> Result<(), VerificationError> {
	let mut segments = assertion.split('.');
	let (Some(header), Some(_), Some(_), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(VerificationError::MalformedAssertion);
	};
	let bytes = URL_SAFE_NO_PAD.decode(header).map_err(|_| VerificationError::MalformedAssertion)?;
	let header = serde_json::from_slice::<WireHeader>(&bytes)
		.map_err(|_| VerificationError::MalformedAssertion)?;

	if header.alg != "RS256" {
		return Err(VerificationError::signature_invalid(format!(
			"algorithm {} is not accepted",
			redact::sanitize_identifier(&header.alg)
		)));
	}

	Ok(())
}

fn map_decode_error(kind: &ErrorKind) -> VerificationError {
	match kind {
		ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) =>
			VerificationError::MalformedAssertion,
		ErrorKind::Json(_) => VerificationError::malformed_claim("payload is not a claim set"),
		ErrorKind::MissingRequiredClaim(claim) =>
			VerificationError::malformed_claim(format!("{claim} is required")),
		ErrorKind::InvalidAlgorithm => VerificationError::signature_invalid("algorithm mismatch"),
		ErrorKind::InvalidSignature => VerificationError::signature_invalid("signature mismatch"),
		_ => VerificationError::signature_invalid("key rejected the assertion"),
	}
}

fn extract_act(raw: Option<RawActClaim>) -> Result<ActClaim, VerificationError> {
	let raw = raw.ok_or_else(|| VerificationError::malformed_claim("act is missing"))?;

	ActClaim::try_from(raw).map_err(|_| VerificationError::malformed_claim("act.sub is missing"))
}
