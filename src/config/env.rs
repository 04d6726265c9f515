//! Environment-driven settings.

// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_ASSERTION_TTL, MAX_ASSERTION_TTL},
	config::{ProviderConfig, Vendor},
	error::ConfigError,
	http::{DEFAULT_REQUEST_TIMEOUT, MAX_RETRY_BUDGET, RetryPolicy},
	obs,
};

const MIN_IDENTIFIER_LEN: usize = 3;
const SHORT_SECRET_LEN: usize = 8;

/// Everything an agent process needs, loaded from environment variables.
///
/// | Variable | Used by |
/// |---|---|
/// | `AGBAC_VENDOR` | all (`keycloak` when unset) |
/// | `AGENT_CLIENT_ID`, `AGENT_CLIENT_SECRET` | all |
/// | `KEYCLOAK_TOKEN_URL` / `AUTH0_TOKEN_URL` / `OKTA_TOKEN_URL` / `ENTRAID_TOKEN_URL` | matching vendor |
/// | `API_AUDIENCE` | Auth0, Okta, Entra ID (act assertion audience) |
/// | `API_SCOPE`, `APP_PRIVATE_KEY_PATH`, `APP_ID` | Entra ID |
/// | `AGENT_ENDPOINT` | out-of-session senders (assertion audience) |
/// | `ASSERTION_TTL_SECONDS`, `HTTP_TIMEOUT_SECONDS`, `HTTP_MAX_RETRIES` | optional tuning |
#[derive(Clone, Debug)]
pub struct AgbacSettings {
	/// Provider connection settings.
	pub provider: ProviderConfig,
	/// Endpoint of the downstream agent, when this process sends out-of-session assertions.
	pub agent_endpoint: Option<String>,
	/// Lifetime of out-of-session assertions.
	pub assertion_ttl: Duration,
	/// Per-request HTTP timeout.
	pub request_timeout: Duration,
	/// Retry policy for token and resource calls.
	pub retry: RetryPolicy,
}
impl AgbacSettings {
	/// Loads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads settings through `lookup`, which returns the raw value of a variable.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let vendor = match lookup("AGBAC_VENDOR") {
			Some(raw) if raw.trim().is_empty() =>
				return Err(ConfigError::EmptyField { field: "AGBAC_VENDOR" }),
			Some(raw) => raw.parse::<Vendor>()?,
			None => Vendor::Keycloak,
		};
		let client_id = get("AGENT_CLIENT_ID")
			.ok_or(ConfigError::MissingField { field: "AGENT_CLIENT_ID" })?;
		let client_secret = get("AGENT_CLIENT_SECRET")
			.ok_or(ConfigError::MissingField { field: "AGENT_CLIENT_SECRET" })?;

		if client_id.chars().count() < MIN_IDENTIFIER_LEN {
			return Err(ConfigError::invalid_value("AGENT_CLIENT_ID", "shorter than 3 characters"));
		}
		if client_secret.chars().count() < SHORT_SECRET_LEN {
			obs::emit_config_warning("AGENT_CLIENT_SECRET", "client secret is unusually short");
		}

		let token_url_field = match vendor {
			Vendor::Keycloak => "KEYCLOAK_TOKEN_URL",
			Vendor::Auth0 => "AUTH0_TOKEN_URL",
			Vendor::Okta => "OKTA_TOKEN_URL",
			Vendor::EntraId => "ENTRAID_TOKEN_URL",
		};
		let token_url =
			get(token_url_field).ok_or(ConfigError::MissingField { field: token_url_field })?;

		check_url(token_url_field, &token_url)?;

		let mut builder = ProviderConfig::builder(vendor)
			.token_url(token_url)
			.client_id(client_id)
			.client_secret(client_secret);

		if vendor != Vendor::Keycloak {
			let audience =
				get("API_AUDIENCE").ok_or(ConfigError::MissingField { field: "API_AUDIENCE" })?;

			builder = if vendor.is_hybrid() {
				builder.act_audience(audience)
			} else {
				builder.audience(audience)
			};
		}
		if vendor.is_hybrid() {
			let scope = get("API_SCOPE").ok_or(ConfigError::MissingField { field: "API_SCOPE" })?;
			let key_path = get("APP_PRIVATE_KEY_PATH")
				.ok_or(ConfigError::MissingField { field: "APP_PRIVATE_KEY_PATH" })?;
			let app_id = get("APP_ID").ok_or(ConfigError::MissingField { field: "APP_ID" })?;

			if !scope.ends_with("/.default") {
				obs::emit_config_warning("API_SCOPE", "Entra ID scopes usually end with /.default");
			}

			check_key_file("APP_PRIVATE_KEY_PATH", Path::new(&key_path))?;

			if app_id.chars().count() < MIN_IDENTIFIER_LEN {
				return Err(ConfigError::invalid_value("APP_ID", "shorter than 3 characters"));
			}

			builder = builder.scope(scope).app_private_key_path(key_path).app_id(app_id);
		}

		let provider = builder.build()?;
		let agent_endpoint = get("AGENT_ENDPOINT");

		if let Some(endpoint) = &agent_endpoint {
			check_url("AGENT_ENDPOINT", endpoint)?;
		}

		let assertion_ttl = match get("ASSERTION_TTL_SECONDS") {
			Some(raw) => {
				let ttl = Duration::seconds(parse_number("ASSERTION_TTL_SECONDS", &raw)?);

				if !ttl.is_positive() || ttl > MAX_ASSERTION_TTL {
					return Err(ConfigError::invalid_value(
						"ASSERTION_TTL_SECONDS",
						"must be between 1 and 300",
					));
				}

				ttl
			},
			None => DEFAULT_ASSERTION_TTL,
		};
		let request_timeout = match get("HTTP_TIMEOUT_SECONDS") {
			Some(raw) => {
				let timeout = Duration::seconds(parse_number("HTTP_TIMEOUT_SECONDS", &raw)?);

				if !timeout.is_positive() {
					return Err(ConfigError::invalid_value("HTTP_TIMEOUT_SECONDS", "must be positive"));
				}

				timeout
			},
			None => DEFAULT_REQUEST_TIMEOUT,
		};
		let retry = match get("HTTP_MAX_RETRIES") {
			Some(raw) => {
				let max_retries = u32::try_from(parse_number("HTTP_MAX_RETRIES", &raw)?)
					.map_err(|_| ConfigError::invalid_value("HTTP_MAX_RETRIES", "must not be negative"))?;

				if max_retries > MAX_RETRY_BUDGET {
					return Err(ConfigError::invalid_value(
						"HTTP_MAX_RETRIES",
						format!("must be at most {MAX_RETRY_BUDGET}"),
					));
				}

				RetryPolicy::default().with_max_retries(max_retries)
			},
			None => RetryPolicy::default(),
		};

		Ok(Self { provider, agent_endpoint, assertion_ttl, request_timeout, retry })
	}
}

fn check_url(field: &'static str, raw: &str) -> Result<(), ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if url.scheme() != "https" {
		return Err(ConfigError::InsecureUrl { field });
	}

	let host = url.host_str().unwrap_or_default();

	if host.is_empty() {
		return Err(ConfigError::invalid_value(field, "missing hostname"));
	}
	if host == "localhost" || host.starts_with("127.") {
		obs::emit_config_warning(field, "URL points at localhost; use only in development");
	}
	if host.ends_with(".local") {
		obs::emit_config_warning(field, "URL uses a .local domain; ensure it resolves");
	}

	Ok(())
}

fn check_key_file(field: &'static str, path: &Path) -> Result<(), ConfigError> {
	let metadata = std::fs::metadata(path)
		.map_err(|source| ConfigError::KeyFile { path: path.to_path_buf(), source })?;

	if !metadata.is_file() {
		return Err(ConfigError::invalid_value(field, "path is not a file"));
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;

		if metadata.permissions().mode() & 0o004 != 0 {
			obs::emit_config_warning(field, "private key file is world-readable");
		}
	}

	Ok(())
}

fn parse_number(field: &'static str, raw: &str) -> Result<i64, ConfigError> {
	raw.parse::<i64>().map_err(|_| ConfigError::invalid_value(field, "not an integer"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app_private.pem");

	fn load(pairs: &[(&str, &str)]) -> Result<AgbacSettings, ConfigError> {
		let vars: HashMap<String, String> =
			pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();

		AgbacSettings::from_lookup(|name| vars.get(name).cloned())
	}

	fn keycloak_vars() -> Vec<(&'static str, &'static str)> {
		vec![
			("AGENT_CLIENT_ID", "finance-agent"),
			("AGENT_CLIENT_SECRET", "s3cr3t-value"),
			("KEYCLOAK_TOKEN_URL", "https://kc.example.com/realms/prod/protocol/openid-connect/token"),
		]
	}

	#[test]
	fn vendor_defaults_to_keycloak() {
		let settings = load(&keycloak_vars()).expect("Keycloak settings should load.");

		assert_eq!(settings.provider.vendor, Vendor::Keycloak);
		assert_eq!(settings.assertion_ttl, DEFAULT_ASSERTION_TTL);
		assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
		assert_eq!(settings.retry, RetryPolicy::default());
		assert!(settings.agent_endpoint.is_none());
	}

	#[test]
	fn unknown_or_blank_vendor_fails() {
		let mut vars = keycloak_vars();

		vars.push(("AGBAC_VENDOR", "ping"));

		assert!(matches!(load(&vars), Err(ConfigError::UnsupportedVendor { .. })));

		let mut vars = keycloak_vars();

		vars.push(("AGBAC_VENDOR", "  "));

		assert!(matches!(load(&vars), Err(ConfigError::EmptyField { field: "AGBAC_VENDOR" })));
	}

	#[test]
	fn credentials_are_checked() {
		assert!(matches!(
			load(&[("KEYCLOAK_TOKEN_URL", "https://kc.example.com/token")]),
			Err(ConfigError::MissingField { field: "AGENT_CLIENT_ID" })
		));
		assert!(matches!(
			load(&[
				("AGENT_CLIENT_ID", "ab"),
				("AGENT_CLIENT_SECRET", "s3cr3t-value"),
				("KEYCLOAK_TOKEN_URL", "https://kc.example.com/token"),
			]),
			Err(ConfigError::InvalidValue { field: "AGENT_CLIENT_ID", .. })
		));

		// Short secrets only warn.
		load(&[
			("AGENT_CLIENT_ID", "finance-agent"),
			("AGENT_CLIENT_SECRET", "short"),
			("KEYCLOAK_TOKEN_URL", "https://kc.example.com/token"),
		])
		.expect("Short secrets should load with a warning.");
	}

	#[test]
	fn token_url_must_be_https() {
		let err = load(&[
			("AGENT_CLIENT_ID", "finance-agent"),
			("AGENT_CLIENT_SECRET", "s3cr3t-value"),
			("KEYCLOAK_TOKEN_URL", "http://kc.example.com/token"),
		])
		.expect_err("Plain HTTP token URLs must be rejected.");

		assert!(matches!(err, ConfigError::InsecureUrl { field: "KEYCLOAK_TOKEN_URL" }));
	}

	#[test]
	fn okta_requires_audience() {
		let vars = [
			("AGBAC_VENDOR", "okta"),
			("AGENT_CLIENT_ID", "0oa1b2c3d4"),
			("AGENT_CLIENT_SECRET", "s3cr3t-value"),
			("OKTA_TOKEN_URL", "https://corp.okta.com/oauth2/default/v1/token"),
		];

		assert!(matches!(load(&vars), Err(ConfigError::MissingField { field: "API_AUDIENCE" })));

		let mut vars = vars.to_vec();

		vars.push(("API_AUDIENCE", "api://default"));

		let settings = load(&vars).expect("Okta settings should load.");

		assert_eq!(settings.provider.audience.as_deref(), Some("api://default"));
	}

	#[test]
	fn entra_id_loads_assertion_settings() {
		let mut vars = vec![
			("AGBAC_VENDOR", "EntraID"),
			("AGENT_CLIENT_ID", "finance-agent"),
			("AGENT_CLIENT_SECRET", "s3cr3t-value"),
			("ENTRAID_TOKEN_URL", "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"),
			("API_AUDIENCE", "https://api.example.com"),
			("API_SCOPE", "https://api.example.com/.default"),
			("APP_ID", "app-123"),
		];

		assert!(matches!(
			load(&vars),
			Err(ConfigError::MissingField { field: "APP_PRIVATE_KEY_PATH" })
		));

		vars.push(("APP_PRIVATE_KEY_PATH", "/nonexistent/app.pem"));

		assert!(matches!(load(&vars), Err(ConfigError::KeyFile { .. })));

		vars.pop();
		vars.push(("APP_PRIVATE_KEY_PATH", KEY_PATH));

		let settings = load(&vars).expect("Entra ID settings should load.");
		let entra_id = settings.provider.entra_id.expect("Entra ID settings should be present.");

		assert_eq!(entra_id.act_audience, "https://api.example.com");
		assert_eq!(entra_id.app_id, "app-123");
		assert!(settings.provider.audience.is_none());
	}

	#[test]
	fn tuning_values_are_validated() {
		let mut vars = keycloak_vars();

		vars.extend([
			("AGENT_ENDPOINT", "https://agent.example.com"),
			("ASSERTION_TTL_SECONDS", "120"),
			("HTTP_TIMEOUT_SECONDS", "5"),
			("HTTP_MAX_RETRIES", "1"),
		]);

		let settings = load(&vars).expect("Tuned settings should load.");

		assert_eq!(settings.agent_endpoint.as_deref(), Some("https://agent.example.com"));
		assert_eq!(settings.assertion_ttl, Duration::seconds(120));
		assert_eq!(settings.request_timeout, Duration::seconds(5));
		assert_eq!(settings.retry.max_retries, 1);

		let mut vars = keycloak_vars();

		vars.push(("HTTP_MAX_RETRIES", "5"));

		assert_eq!(load(&vars).expect("Budget at the cap should load.").retry.max_retries, 5);

		for (field, value) in [
			("ASSERTION_TTL_SECONDS", "301"),
			("HTTP_TIMEOUT_SECONDS", "0"),
			("HTTP_MAX_RETRIES", "x"),
			("HTTP_MAX_RETRIES", "6"),
			("HTTP_MAX_RETRIES", "-1"),
		] {
			let mut vars = keycloak_vars();

			vars.push((field, value));

			assert!(
				matches!(load(&vars), Err(ConfigError::InvalidValue { .. })),
				"{field}={value} should be rejected."
			);
		}
	}
}
