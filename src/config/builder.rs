//! Validated construction of [`ProviderConfig`] values.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{EntraIdSettings, ProviderConfig, Vendor},
	error::ConfigError,
};

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	vendor: Vendor,
	token_url: Option<String>,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	audience: Option<String>,
	scope: Option<String>,
	app_private_key_path: Option<PathBuf>,
	app_id: Option<String>,
	act_audience: Option<String>,
}
impl ProviderConfigBuilder {
	/// Creates an empty builder for `vendor`.
	pub fn new(vendor: Vendor) -> Self {
		Self {
			vendor,
			token_url: None,
			client_id: None,
			client_secret: None,
			audience: None,
			scope: None,
			app_private_key_path: None,
			app_id: None,
			act_audience: None,
		}
	}

	/// Sets the token endpoint.
	pub fn token_url(mut self, url: impl Into<String>) -> Self {
		self.token_url = Some(url.into());

		self
	}

	/// Sets the agent client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the agent client secret.
	pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(client_secret));

		self
	}

	/// Sets the API audience.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Sets the provider scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the application private key used for Entra ID act assertions.
	pub fn app_private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.app_private_key_path = Some(path.into());

		self
	}

	/// Sets the application identifier used as the Entra ID act assertion issuer.
	pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
		self.app_id = Some(app_id.into());

		self
	}

	/// Sets the audience of Entra ID act assertions.
	pub fn act_audience(mut self, act_audience: impl Into<String>) -> Self {
		self.act_audience = Some(act_audience.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ConfigError> {
		let raw_url = required("token_url", self.token_url)?;
		let token_url = Url::parse(&raw_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "token_url", source })?;
		let client_id = required("client_id", self.client_id)?;
		let client_secret =
			self.client_secret.ok_or(ConfigError::MissingField { field: "client_secret" })?;
		let entra_id = if self.vendor.is_hybrid() {
			Some(EntraIdSettings {
				app_private_key_path: self
					.app_private_key_path
					.ok_or(ConfigError::MissingField { field: "app_private_key_path" })?,
				app_id: required("app_id", self.app_id)?,
				act_audience: required("act_audience", self.act_audience)?,
			})
		} else {
			None
		};
		let config = ProviderConfig {
			vendor: self.vendor,
			token_url,
			client_id,
			client_secret,
			audience: optional(self.audience),
			scope: optional(self.scope),
			entra_id,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ProviderConfig {
	/// Checks the invariants every adapter relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.token_url.scheme() != "https" {
			return Err(ConfigError::InsecureUrl { field: "token_url" });
		}
		if self.token_url.host_str().is_none_or(str::is_empty) {
			return Err(ConfigError::invalid_value("token_url", "missing hostname"));
		}
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyField { field: "client_id" });
		}
		if self.client_secret.expose().trim().is_empty() {
			return Err(ConfigError::EmptyField { field: "client_secret" });
		}

		match self.vendor {
			Vendor::Auth0 if self.audience.is_none() =>
				return Err(ConfigError::MissingField { field: "audience" }),
			Vendor::EntraId => {
				if self.scope.is_none() {
					return Err(ConfigError::MissingField { field: "scope" });
				}

				let entra_id =
					self.entra_id.as_ref().ok_or(ConfigError::MissingField { field: "app_id" })?;
				let act_audience = Url::parse(&entra_id.act_audience)
					.map_err(|source| ConfigError::InvalidUrl { field: "act_audience", source })?;

				if act_audience.scheme() != "https" {
					return Err(ConfigError::InsecureUrl { field: "act_audience" });
				}
			},
			_ => (),
		}

		Ok(())
	}
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	let value = value.ok_or(ConfigError::MissingField { field })?;
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(ConfigError::EmptyField { field });
	}

	Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}
