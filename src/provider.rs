//! Vendor adapters: one closed set of provider dialects behind a single token operation.
//!
//! Direct-claim providers (Keycloak, Auth0, Okta) receive `sub` and `act` inside the token
//! request. The hybrid-assertion provider (Entra ID) only issues agent tokens, so the adapter
//! pairs the token with an application-signed act assertion the caller forwards as
//! `X-Act-Assertion`.

mod direct;
mod hybrid;

// self
use crate::{
	_prelude::*,
	auth::{ActClaim, AgentId, NormalizedTokenResult, ScopeSet, ScopeValidationError},
	config::{AgbacSettings, ProviderConfig, Vendor},
	http::{ReqwestHttpClient, RetryPolicy, TokenHttpClient},
	oauth::{self, ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	redact,
};
use direct::DirectClaimProfile;
use hybrid::HybridProfile;

/// Adapter specialized for the crate's default reqwest transport stack.
pub type ReqwestVendorAdapter = VendorAdapter<ReqwestHttpClient, ReqwestTransportErrorMapper>;

enum Dialect<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	Keycloak(DirectClaimProfile),
	Auth0(DirectClaimProfile),
	Okta(DirectClaimProfile),
	EntraId(HybridProfile<C, M>),
}

/// Requests dual-subject tokens from one configured provider.
///
/// The configuration is validated at construction and immutable afterwards. Every call makes
/// one provider request plus at most [`RetryPolicy::max_retries`] retries on transient
/// failures.
pub struct VendorAdapter<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	dialect: Dialect<C, M>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	retry: RetryPolicy,
}
impl<C, M> VendorAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds an adapter that reuses the caller-provided transport + mapper pair.
	///
	/// Fails with [`Error::Config`] when `config` breaks a vendor invariant, or when the Entra ID
	/// application key cannot be loaded.
	pub fn with_http_client(
		config: ProviderConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		config.validate()?;

		let http_client = http_client.into();
		let transport_mapper = mapper.into();
		let dialect = match config.vendor {
			Vendor::Keycloak => Dialect::Keycloak(DirectClaimProfile::new(config)),
			Vendor::Auth0 => Dialect::Auth0(DirectClaimProfile::new(config)),
			Vendor::Okta => Dialect::Okta(DirectClaimProfile::new(config)),
			Vendor::EntraId => Dialect::EntraId(HybridProfile::new(
				config,
				http_client.clone(),
				transport_mapper.clone(),
			)?),
		};

		Ok(Self { dialect, http_client, transport_mapper, retry: RetryPolicy::default() })
	}

	/// Overrides the retry policy for transient provider failures.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the lifetime of Entra ID act assertions; ignored by direct-claim vendors.
	pub fn with_act_assertion_ttl(mut self, ttl_seconds: i64) -> Self {
		if let Dialect::EntraId(profile) = &mut self.dialect {
			profile.act_ttl = ttl_seconds;
		}

		self
	}

	/// Provider this adapter talks to.
	pub fn vendor(&self) -> Vendor {
		self.config().vendor
	}

	/// Validated configuration the adapter was built from.
	pub fn config(&self) -> &ProviderConfig {
		match &self.dialect {
			Dialect::Keycloak(profile) | Dialect::Auth0(profile) | Dialect::Okta(profile) =>
				&profile.config,
			Dialect::EntraId(profile) => &profile.config,
		}
	}

	/// Requests a token binding `agent_id` (`sub`) and `act` for `scopes`.
	///
	/// Non-success provider responses surface as [`Error::TokenRequest`] with the status code
	/// attached.
	pub async fn request_token(
		&self,
		agent_id: &AgentId,
		act: &ActClaim,
		scopes: &ScopeSet,
	) -> Result<NormalizedTokenResult> {
		const KIND: FlowKind = FlowKind::TokenRequest;

		let span = FlowSpan::new(KIND, self.vendor().as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		span.record_subject(&redact::sanitize_identifier(agent_id.as_str()));

		let result = span
			.instrument(async move {
				if scopes.is_empty() {
					return Err(ScopeValidationError::Missing.into());
				}

				match &self.dialect {
					Dialect::Keycloak(profile) => {
						let body = profile.form_body(agent_id, act, scopes)?;

						self.post_with_retry(&profile.config, body, scopes).await
					},
					Dialect::Auth0(profile) | Dialect::Okta(profile) => {
						let body = profile.json_body(agent_id, act, scopes)?;

						self.post_with_retry(&profile.config, body, scopes).await
					},
					Dialect::EntraId(profile) => {
						let mut token = self
							.retry
							.run(KIND, || profile.facade.exchange(&profile.scope, scopes))
							.await?;

						token.act_assertion = Some(
							profile.sign_act(agent_id, act, OffsetDateTime::now_utc())?.into_secret(),
						);

						Ok(token)
					},
				}
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn post_with_retry(
		&self,
		config: &ProviderConfig,
		body: oauth::TokenRequestBody,
		scopes: &ScopeSet,
	) -> Result<NormalizedTokenResult> {
		let response = self
			.retry
			.run(FlowKind::TokenRequest, || {
				oauth::post_token_request(
					self.http_client.as_ref(),
					self.transport_mapper.as_ref(),
					config.vendor,
					&config.token_url,
					body.clone(),
				)
			})
			.await?;

		Ok(response.normalize(scopes))
	}
}
#[cfg(feature = "reqwest")]
impl VendorAdapter<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds an adapter with its own reqwest transport (10s timeout, redirects disabled).
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::new()?, ReqwestTransportErrorMapper)
	}

	/// Builds an adapter honoring the timeout and retry budget of environment-loaded settings.
	pub fn from_settings(settings: &AgbacSettings) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(settings.request_timeout)?;
		let adapter = Self::with_http_client(
			settings.provider.clone(),
			http_client,
			ReqwestTransportErrorMapper,
		)?;

		Ok(adapter.with_retry_policy(settings.retry))
	}
}
impl<C, M> Debug for VendorAdapter<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VendorAdapter")
			.field("config", self.config())
			.field("retry", &self.retry)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::ConfigError};

	fn keycloak() -> ProviderConfig {
		ProviderConfig::builder(Vendor::Keycloak)
			.token_url("https://kc.example.com/realms/prod/protocol/openid-connect/token")
			.client_id("finance-agent")
			.client_secret("s3cr3t-value")
			.build()
			.expect("Keycloak fixture should build.")
	}

	#[test]
	fn construction_revalidates_config() {
		let mut config = keycloak();

		config.token_url = Url::parse("http://kc.example.com/token").expect("URL should parse.");

		assert!(matches!(
			ReqwestVendorAdapter::with_http_client(
				config,
				test_reqwest_http_client(),
				ReqwestTransportErrorMapper
			),
			Err(Error::Config(ConfigError::InsecureUrl { field: "token_url" }))
		));
	}

	#[test]
	fn entra_id_needs_a_readable_key() {
		let config = ProviderConfig::builder(Vendor::EntraId)
			.token_url("https://login.example.com/tenant/oauth2/v2.0/token")
			.client_id("finance-agent")
			.client_secret("s3cr3t-value")
			.scope("https://api.example.com/.default")
			.app_private_key_path("/nonexistent/app.pem")
			.app_id("app-123")
			.act_audience("https://api.example.com")
			.build()
			.expect("Entra ID fixture should build.");

		assert!(matches!(
			VendorAdapter::new(config),
			Err(Error::Config(ConfigError::KeyFile { .. }))
		));
	}

	#[test]
	fn settings_carry_their_retry_budget() {
		let settings = AgbacSettings::from_lookup(|name| match name {
			"AGENT_CLIENT_ID" => Some("finance-agent".into()),
			"AGENT_CLIENT_SECRET" => Some("s3cr3t-value".into()),
			"KEYCLOAK_TOKEN_URL" => Some("https://kc.example.com/token".into()),
			"HTTP_MAX_RETRIES" => Some("1".into()),
			_ => None,
		})
		.expect("Settings should load.");
		let adapter = VendorAdapter::from_settings(&settings).expect("Adapter should build.");

		assert_eq!(adapter.retry.max_retries, 1);
		assert_eq!(adapter.config().client_id, "finance-agent");
	}

	#[tokio::test]
	async fn empty_scopes_are_rejected_before_any_call() {
		let adapter = ReqwestVendorAdapter::with_http_client(
			keycloak(),
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.expect("Adapter should build.");
		let agent = AgentId::new("agent-1").expect("Agent fixture should be valid.");
		let empty = ScopeSet::new(Vec::<String>::new()).expect("Empty scope set should build.");
		let err = adapter
			.request_token(&agent, &alice(), &empty)
			.await
			.expect_err("Empty scopes must be rejected.");

		assert!(matches!(err, Error::InvalidClaim { .. }));
		assert_eq!(adapter.vendor(), Vendor::Keycloak);
	}
}
