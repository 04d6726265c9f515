//! Provider selection and connection settings.

pub mod builder;
pub mod env;

pub use builder::*;
pub use env::*;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Identity providers with a dual-subject token dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
	/// Keycloak; form-encoded `sub` + JSON-text `act` extension parameters.
	Keycloak,
	/// Auth0; JSON body with a required audience.
	Auth0,
	/// Okta; JSON body with an optional audience.
	Okta,
	/// Microsoft Entra ID; standard client credentials plus an application-signed act
	/// assertion.
	#[serde(rename = "entraid")]
	EntraId,
}
impl Vendor {
	/// Every supported vendor.
	pub const ALL: [Vendor; 4] = [Vendor::Keycloak, Vendor::Auth0, Vendor::Okta, Vendor::EntraId];

	/// Stable lowercase label used in config, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Vendor::Keycloak => "keycloak",
			Vendor::Auth0 => "auth0",
			Vendor::Okta => "okta",
			Vendor::EntraId => "entraid",
		}
	}

	/// Returns `true` when the provider cannot embed `act` in its tokens.
	pub const fn is_hybrid(self) -> bool {
		matches!(self, Vendor::EntraId)
	}
}
impl Display for Vendor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Vendor {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase();

		Vendor::ALL
			.into_iter()
			.find(|vendor| vendor.as_str() == normalized)
			.ok_or(ConfigError::UnsupportedVendor { vendor: normalized })
	}
}

/// Settings needed to request dual-subject tokens from one provider.
///
/// Built and validated through [`ProviderConfig::builder`].
#[derive(Clone)]
pub struct ProviderConfig {
	/// Provider dialect.
	pub vendor: Vendor,
	/// HTTPS token endpoint.
	pub token_url: Url,
	/// Agent client identifier.
	pub client_id: String,
	pub(crate) client_secret: TokenSecret,
	/// API audience forwarded to the provider (required for Auth0).
	pub audience: Option<String>,
	/// Provider scope (required for Entra ID, usually `<resource>/.default`).
	pub scope: Option<String>,
	/// Hybrid-assertion settings; present iff `vendor` is [`Vendor::EntraId`].
	pub entra_id: Option<EntraIdSettings>,
}
impl ProviderConfig {
	/// Starts a builder for `vendor`.
	pub fn builder(vendor: Vendor) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(vendor)
	}

	/// Agent client secret. Callers must avoid logging it.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}
}
impl Debug for ProviderConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderConfig")
			.field("vendor", &self.vendor)
			.field("token_url", &crate::redact::hash_url(self.token_url.as_str()))
			.field("client_id", &crate::redact::sanitize_identifier(&self.client_id))
			.field("client_secret", &self.client_secret)
			.field("audience", &self.audience)
			.field("scope", &self.scope)
			.field("entra_id", &self.entra_id)
			.finish()
	}
}

/// Settings for the application-signed act assertion that accompanies Entra ID tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntraIdSettings {
	/// PEM file holding the application's RSA private key.
	pub app_private_key_path: PathBuf,
	/// Application identifier, used as the assertion issuer.
	pub app_id: String,
	/// Audience of the act assertion; the protected API.
	pub act_audience: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn vendor_names_parse_case_insensitively() {
		assert_eq!(Vendor::from_str(" Keycloak ").expect("Keycloak should parse."), Vendor::Keycloak);
		assert_eq!(Vendor::from_str("ENTRAID").expect("EntraID should parse."), Vendor::EntraId);
		assert!(matches!(
			Vendor::from_str("ping"),
			Err(ConfigError::UnsupportedVendor { vendor }) if vendor == "ping"
		));

		for vendor in Vendor::ALL {
			assert_eq!(vendor.to_string().parse::<Vendor>().ok(), Some(vendor));
		}
	}

	#[test]
	fn vendor_serde_uses_labels() {
		assert_eq!(
			serde_json::to_string(&Vendor::EntraId).expect("Vendor should serialize."),
			"\"entraid\""
		);
		assert!(Vendor::EntraId.is_hybrid());
		assert!(!Vendor::Okta.is_hybrid());
	}
}
