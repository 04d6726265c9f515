//! Request bodies for providers that accept `sub` and `act` in the token request.

// self
use crate::{
	_prelude::*,
	auth::{ActClaim, AgentId, ScopeSet},
	config::{ProviderConfig, Vendor},
	error::ConfigError,
	oauth::TokenRequestBody,
};

const GRANT_TYPE: &str = "client_credentials";

pub(super) struct DirectClaimProfile {
	pub(super) config: ProviderConfig,
}
impl DirectClaimProfile {
	pub(super) fn new(config: ProviderConfig) -> Self {
		Self { config }
	}

	/// Keycloak dialect: form-encoded, `act` carried as JSON text.
	pub(super) fn form_body(
		&self,
		agent_id: &AgentId,
		act: &ActClaim,
		scopes: &ScopeSet,
	) -> Result<TokenRequestBody> {
		let mut pairs = vec![
			("grant_type", GRANT_TYPE.to_owned()),
			("client_id", self.config.client_id.clone()),
			("client_secret", self.config.client_secret().expose().to_owned()),
			("scope", scopes.normalized()),
			("sub", agent_id.as_str().to_owned()),
			("act", act.to_json_string()?),
		];

		if let Some(audience) = &self.config.audience {
			pairs.push(("audience", audience.clone()));
		}

		Ok(TokenRequestBody::Form(pairs))
	}

	/// Auth0 and Okta dialect: JSON object with `act` nested.
	pub(super) fn json_body(
		&self,
		agent_id: &AgentId,
		act: &ActClaim,
		scopes: &ScopeSet,
	) -> Result<TokenRequestBody> {
		let mut body = serde_json::Map::new();

		body.insert("grant_type".into(), GRANT_TYPE.into());
		body.insert("client_id".into(), self.config.client_id.clone().into());
		body.insert("client_secret".into(), self.config.client_secret().expose().into());

		match (&self.config.audience, self.config.vendor) {
			(Some(audience), _) => {
				body.insert("audience".into(), audience.clone().into());
			},
			(None, Vendor::Auth0) =>
				return Err(ConfigError::MissingField { field: "audience" }.into()),
			(None, _) => (),
		}

		body.insert("scope".into(), scopes.normalized().into());
		body.insert("sub".into(), agent_id.as_str().into());
		body.insert("act".into(), serde_json::to_value(act).map_err(ConfigError::from)?);

		Ok(TokenRequestBody::Json(body.into()))
	}
}
