//! Entra ID profile: agent-only client-credentials token plus an application-signed act
//! assertion.

// self
use crate::{
	_prelude::*,
	auth::{ActClaim, AgentId},
	config::ProviderConfig,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{ClientCredentialsFacade, TransportErrorMapper},
	sender::{HybridSender, SignedAssertion},
};

/// Lifetime of the act assertion paired with each token.
pub(super) const DEFAULT_ACT_TTL_SECONDS: i64 = 300;

pub(super) struct HybridProfile<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(super) config: ProviderConfig,
	pub(super) facade: ClientCredentialsFacade<C, M>,
	pub(super) scope: String,
	pub(super) act_ttl: i64,
	act_audience: String,
	signer: HybridSender,
}
impl<C, M> HybridProfile<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(super) fn new(config: ProviderConfig, http_client: Arc<C>, mapper: Arc<M>) -> Result<Self> {
		let settings = config.entra_id.clone().ok_or(ConfigError::MissingField { field: "app_id" })?;
		let scope = config.scope.clone().ok_or(ConfigError::MissingField { field: "scope" })?;
		let signer =
			HybridSender::from_pem_file(&settings.app_private_key_path)?.with_issuer(settings.app_id);
		let facade = ClientCredentialsFacade::from_config(&config, http_client, mapper)?;

		Ok(Self {
			config,
			facade,
			scope,
			act_ttl: DEFAULT_ACT_TTL_SECONDS,
			act_audience: settings.act_audience,
			signer,
		})
	}

	/// Signs `act` for the protected API with `iss = app_id` and `sub = agent_id`.
	pub(super) fn sign_act(
		&self,
		agent_id: &AgentId,
		act: &ActClaim,
		issued_at: OffsetDateTime,
	) -> Result<SignedAssertion> {
		self.signer.sign_at(agent_id.as_str(), act, &self.act_audience, self.act_ttl, issued_at)
	}
}
