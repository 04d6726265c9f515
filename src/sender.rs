//! Application-side production of act data for both delivery modes.
//!
//! In-session callers hand the [`ActClaim`] straight to an adapter. Out-of-session callers get
//! a short-lived RS256 assertion they transmit to the agent, which recovers the claim with
//! [`OutOfSessionVerifier`](crate::verifier::OutOfSessionVerifier).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::RngCore;
// self
use crate::{
	_prelude::*,
	auth::{
		APPLICATION_ISSUER, ActClaim, AssertionRequest, MAX_ASSERTION_TTL, SessionFields,
		TokenSecret,
	},
	config::AgbacSettings,
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	redact,
};

const NONCE_BYTES: usize = 32;

/// Compact RS256 JWS carrying an act claim. Treated as a credential until it expires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedAssertion(TokenSecret);
impl SignedAssertion {
	/// Wraps a compact assertion received from the wire.
	pub fn new(compact: impl Into<String>) -> Self {
		Self(TokenSecret::new(compact))
	}

	/// Returns the compact serialization. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Unwraps the redacting container.
	pub fn into_secret(self) -> TokenSecret {
		self.0
	}
}

/// Produces act data for in-session and out-of-session delivery.
///
/// The private key is loaded once at construction and never rotated. A sender without a key
/// still serves the in-session path and session extraction.
#[derive(Clone)]
pub struct HybridSender {
	signing_key: Option<Arc<EncodingKey>>,
	issuer: String,
	max_ttl: Duration,
}
impl HybridSender {
	/// Sender without a signing key; out-of-session calls fail with
	/// [`Error::SigningKeyMissing`].
	pub fn in_session_only() -> Self {
		Self { signing_key: None, issuer: APPLICATION_ISSUER.into(), max_ttl: MAX_ASSERTION_TTL }
	}

	/// Loads a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
	pub fn from_rsa_pem(pem: &[u8]) -> Result<Self> {
		let key =
			EncodingKey::from_rsa_pem(pem).map_err(|source| ConfigError::InvalidKey { source })?;

		Ok(Self { signing_key: Some(Arc::new(key)), ..Self::in_session_only() })
	}

	/// Reads and loads a PEM-encoded RSA private key file.
	pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let pem = std::fs::read(path)
			.map_err(|source| ConfigError::KeyFile { path: path.to_path_buf(), source })?;

		Self::from_rsa_pem(&pem)
	}

	/// Overrides the `iss`/`sub` marker stamped on out-of-session assertions.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = issuer.into();

		self
	}

	/// Overrides the longest lifetime callers may request.
	pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
		self.max_ttl = max_ttl;

		self
	}

	/// Returns `true` when out-of-session signing is available.
	pub fn has_signing_key(&self) -> bool {
		self.signing_key.is_some()
	}

	/// Issuer stamped on signed assertions.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Maps a session record onto an act claim; see [`crate::auth::act_from_session`].
	pub fn extract_act_from_session<S>(&self, session: &S) -> Result<ActClaim>
	where
		S: ?Sized + SessionFields,
	{
		let span = FlowSpan::new(FlowKind::ActExtraction, "session");
		let _guard = span.clone().entered();

		obs::record_flow_outcome(FlowKind::ActExtraction, FlowOutcome::Attempt);

		let result = crate::auth::act_from_session(session);

		if let Ok(act) = &result {
			span.record_subject(&redact::sanitize_identifier(act.sub()));
		}

		obs::record_flow_result(FlowKind::ActExtraction, &result);

		result
	}

	/// Returns the claim unchanged; keeps one call surface for both modes.
	pub fn prepare_in_session(&self, claim: ActClaim) -> ActClaim {
		claim
	}

	/// Signs `claim` for delivery to `audience`, valid for `ttl_seconds` from now.
	pub fn prepare_out_of_session(
		&self,
		claim: &ActClaim,
		audience: &str,
		ttl_seconds: i64,
	) -> Result<SignedAssertion> {
		self.prepare_out_of_session_at(claim, audience, ttl_seconds, OffsetDateTime::now_utc())
	}

	/// Signs `claim` for the agent endpoint and lifetime configured in `settings`.
	///
	/// Fails with [`ConfigError::MissingField`] when `AGENT_ENDPOINT` was not set.
	pub fn prepare_for_configured_agent(
		&self,
		claim: &ActClaim,
		settings: &AgbacSettings,
	) -> Result<SignedAssertion> {
		let audience = settings
			.agent_endpoint
			.as_deref()
			.ok_or(ConfigError::MissingField { field: "AGENT_ENDPOINT" })?;

		self.prepare_out_of_session(claim, audience, settings.assertion_ttl.whole_seconds())
	}

	/// Same as [`prepare_out_of_session`](Self::prepare_out_of_session) with an explicit issue
	/// time.
	pub fn prepare_out_of_session_at(
		&self,
		claim: &ActClaim,
		audience: &str,
		ttl_seconds: i64,
		issued_at: OffsetDateTime,
	) -> Result<SignedAssertion> {
		let span = FlowSpan::new(FlowKind::AssertionSigning, "out_of_session");
		let _guard = span.clone().entered();

		obs::record_flow_outcome(FlowKind::AssertionSigning, FlowOutcome::Attempt);
		span.record_subject(&redact::sanitize_identifier(claim.sub()));

		let result = self.sign_at(&self.issuer, claim, audience, ttl_seconds, issued_at);

		obs::record_flow_result(FlowKind::AssertionSigning, &result);

		result
	}

	/// Signs an assertion whose `sub` is `subject` instead of the issuer marker.
	pub(crate) fn sign_at(
		&self,
		subject: &str,
		claim: &ActClaim,
		audience: &str,
		ttl_seconds: i64,
		issued_at: OffsetDateTime,
	) -> Result<SignedAssertion> {
		let key = self.signing_key.as_deref().ok_or(Error::SigningKeyMissing)?;
		let request = AssertionRequest::bounded(audience, ttl_seconds, self.max_ttl)?;
		let claims = request.claims(&self.issuer, subject, claim, issued_at, fresh_nonce());
		let compact = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, key)
			.map_err(|source| ConfigError::InvalidKey { source })?;

		Ok(SignedAssertion::new(compact))
	}
}
impl Debug for HybridSender {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HybridSender")
			.field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
			.field("issuer", &self.issuer)
			.field("max_ttl", &self.max_ttl)
			.finish()
	}
}
impl Default for HybridSender {
	fn default() -> Self {
		Self::in_session_only()
	}
}

/// 256-bit nonce from the OS-seeded CSPRNG, base64url without padding.
fn fresh_nonce() -> String {
	let mut bytes = [0_u8; NONCE_BYTES];

	rand::rng().fill_bytes(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// self
	use super::*;
	use crate::_preludet::*;

	fn decode_segment(assertion: &SignedAssertion, index: usize) -> serde_json::Value {
		let segment = assertion.expose().split('.').nth(index).expect("Segment should exist.");
		let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Segment should be base64url.");

		serde_json::from_slice(&bytes).expect("Segment should be JSON.")
	}

	#[test]
	fn in_session_is_identity() {
		let claim = alice().with_email("alice@corp.example");

		assert_eq!(HybridSender::in_session_only().prepare_in_session(claim.clone()), claim);
	}

	#[test]
	fn signing_requires_a_key() {
		let err = HybridSender::in_session_only()
			.prepare_out_of_session(&alice(), AGENT_ENDPOINT, 60)
			.expect_err("Keyless sender must refuse to sign.");

		assert!(matches!(err, Error::SigningKeyMissing));
	}

	#[test]
	fn request_bounds_are_enforced() {
		let sender = test_sender();

		let cases = [("http://agent.example.com", 60), (AGENT_ENDPOINT, 0), (AGENT_ENDPOINT, 301)];

		for (audience, ttl) in cases {
			assert!(matches!(
				sender.prepare_out_of_session(&alice(), audience, ttl),
				Err(Error::InvalidAssertionRequest { .. })
			));
		}
	}

	#[test]
	fn assertion_layout_matches_wire_format() {
		let issued_at = OffsetDateTime::from_unix_timestamp(1_700_000_000)
			.expect("Timestamp fixture should be valid.");
		let assertion = test_sender()
			.prepare_out_of_session_at(&alice(), AGENT_ENDPOINT, 60, issued_at)
			.expect("Signing should succeed.");
		let header = decode_segment(&assertion, 0);
		let payload = decode_segment(&assertion, 1);

		assert_eq!(header["alg"], "RS256");
		assert_eq!(header["typ"], "JWT");
		assert_eq!(payload["iss"], "application");
		assert_eq!(payload["sub"], "application");
		assert_eq!(payload["aud"], AGENT_ENDPOINT);
		assert_eq!(payload["iat"], 1_700_000_000);
		assert_eq!(payload["exp"], 1_700_000_060);
		assert_eq!(payload["act"], serde_json::json!({ "sub": "alice" }));
		assert!(payload["jti"].as_str().is_some_and(|jti| jti.len() >= 43));
	}

	#[test]
	fn configured_agent_endpoint_and_ttl_are_used() {
		let lookup = |name: &str| {
			match name {
				"AGENT_CLIENT_ID" => Some("agent-finance"),
				"AGENT_CLIENT_SECRET" => Some("s3cr3t-value"),
				"KEYCLOAK_TOKEN_URL" => Some("https://kc.example.com/token"),
				"AGENT_ENDPOINT" => Some(AGENT_ENDPOINT),
				"ASSERTION_TTL_SECONDS" => Some("120"),
				_ => None,
			}
			.map(str::to_owned)
		};
		let settings = AgbacSettings::from_lookup(lookup).expect("Settings should load.");
		let assertion = test_sender()
			.prepare_for_configured_agent(&alice(), &settings)
			.expect("Signing should succeed.");
		let payload = decode_segment(&assertion, 1);
		let lifetime = payload["exp"].as_i64().expect("exp should be an integer.")
			- payload["iat"].as_i64().expect("iat should be an integer.");

		assert_eq!(payload["aud"], AGENT_ENDPOINT);
		assert_eq!(lifetime, 120);

		let settings = AgbacSettings { agent_endpoint: None, ..settings };

		assert!(matches!(
			test_sender().prepare_for_configured_agent(&alice(), &settings),
			Err(Error::Config(ConfigError::MissingField { field: "AGENT_ENDPOINT" }))
		));
	}

	#[test]
	fn nonces_are_unique() {
		let nonces: HashSet<String> = (0..256).map(|_| fresh_nonce()).collect();

		assert_eq!(nonces.len(), 256);
	}

	#[test]
	fn session_extraction_flows_through_sender() {
		let session = serde_json::json!({ "oid": "42", "mail": "alice@corp.example" });
		let act = HybridSender::default()
			.extract_act_from_session(&session)
			.expect("Session should map.");

		assert_eq!(act.sub(), "42");
	}

	#[test]
	fn key_loading_failures_are_config_errors() {
		assert!(matches!(
			HybridSender::from_rsa_pem(b"not a key"),
			Err(Error::Config(ConfigError::InvalidKey { .. }))
		));
		assert!(matches!(
			HybridSender::from_pem_file("/nonexistent/key.pem"),
			Err(Error::Config(ConfigError::KeyFile { .. }))
		));
		assert!(HybridSender::from_pem_file(APP_PRIVATE_KEY_PATH)
			.expect("Fixture key file should load.")
			.has_signing_key());
	}

	#[test]
	fn debug_hides_key() {
		assert!(format!("{:?}", test_sender()).contains("<redacted>"));
	}
}
