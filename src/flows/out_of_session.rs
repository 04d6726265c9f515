// self
use crate::{
	_prelude::*,
	auth::{ActClaim, AgentId, NormalizedTokenResult, ScopeSet},
	error::ConfigError,
	flows,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	provider::VendorAdapter,
	verifier::OutOfSessionVerifier,
};

/// Token requester for agents that receive the human's identity as a signed assertion.
///
/// Each assertion is accepted once; the expected audience is this agent's own endpoint.
pub struct OutOfSessionTokenRequester<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	verifier: OutOfSessionVerifier,
	adapter: VendorAdapter<C, M>,
	expected_audience: String,
}
impl<C, M> OutOfSessionTokenRequester<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a requester accepting assertions addressed to `expected_audience`.
	///
	/// Fails with [`ConfigError::InsecureUrl`] unless the audience is an HTTPS URL.
	pub fn new(
		verifier: OutOfSessionVerifier,
		adapter: VendorAdapter<C, M>,
		expected_audience: impl Into<String>,
	) -> Result<Self> {
		let expected_audience = expected_audience.into();
		let parsed = Url::parse(&expected_audience)
			.map_err(|source| ConfigError::InvalidUrl { field: "expected_audience", source })?;

		if parsed.scheme() != "https" {
			return Err(ConfigError::InsecureUrl { field: "expected_audience" }.into());
		}

		Ok(Self { verifier, adapter, expected_audience })
	}

	/// Audience received assertions must carry.
	pub fn expected_audience(&self) -> &str {
		&self.expected_audience
	}

	/// Adapter tokens are requested from.
	pub fn adapter(&self) -> &VendorAdapter<C, M> {
		&self.adapter
	}

	/// Verifies `assertion` and returns the act claim it carries, consuming its nonce.
	pub async fn receive(&self, assertion: &str) -> Result<ActClaim> {
		self.verifier.verify(assertion, &self.expected_audience).await
	}

	/// Verifies `assertion`, then requests a token for `agent_id` acting on behalf of its act
	/// claim.
	pub async fn request_token(
		&self,
		agent_id: &AgentId,
		assertion: &str,
		scopes: &ScopeSet,
	) -> Result<NormalizedTokenResult> {
		flows::require_scopes(scopes)?;

		let act = self.receive(assertion).await?;

		self.adapter.request_token(agent_id, &act, scopes).await
	}
}
impl<C, M> Debug for OutOfSessionTokenRequester<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OutOfSessionTokenRequester")
			.field("verifier", &self.verifier)
			.field("adapter", &self.adapter)
			.field("expected_audience", &self.expected_audience)
			.finish()
	}
}
