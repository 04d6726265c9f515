//! Token endpoint calls: the raw dual-subject POST used by direct-claim providers and the
//! `oauth2` client-credentials facade used by hybrid-assertion providers.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, HttpRequest, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{
		DEFAULT_EXPIRES_IN, DEFAULT_TOKEN_TYPE, NormalizedTokenResult, ScopeSet, TokenSecret,
	},
	config::{ProviderConfig, Vendor},
	error::{ConfigError, TokenRequestError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const MAX_ERROR_CODE_LEN: usize = 64;
const GENERIC_FAILURE: &str = "unexpected response";

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		vendor: Vendor,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_vendor: Vendor,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TokenRequestError::Io(inner).into(),
			HttpClientError::Other(message) =>
				TokenRequestError::Unexpected { status_code: meta_status(meta), message }.into(),
			_ => TokenRequestError::Unexpected {
				status_code: meta_status(meta),
				message: "HTTP client error".into(),
			}
			.into(),
		}
	}
}

/// Token request body in a provider's wire dialect.
#[derive(Clone, Debug)]
pub(crate) enum TokenRequestBody {
	/// `application/x-www-form-urlencoded` pairs.
	Form(Vec<(&'static str, String)>),
	/// `application/json` object.
	Json(serde_json::Value),
}
impl TokenRequestBody {
	fn content_type(&self) -> &'static str {
		match self {
			Self::Form(_) => "application/x-www-form-urlencoded",
			Self::Json(_) => "application/json",
		}
	}

	fn encode(&self) -> Result<Vec<u8>> {
		match self {
			Self::Form(pairs) => Ok(url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
				.finish()
				.into_bytes()),
			Self::Json(value) => serde_json::to_vec(value).map_err(|e| ConfigError::from(e).into()),
		}
	}

	fn into_http_request(self, url: &Url) -> Result<HttpRequest> {
		let body = self.encode()?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(CONTENT_TYPE, self.content_type())
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(ConfigError::from)?;

		Ok(request)
	}
}

/// Success body of a token endpoint; optional fields fall back to defaults.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<u64>,
	#[serde(default)]
	scope: Option<String>,
}
impl TokenEndpointResponse {
	pub(crate) fn normalize(self, requested: &ScopeSet) -> NormalizedTokenResult {
		NormalizedTokenResult {
			access_token: TokenSecret::new(self.access_token),
			token_type: normalize_token_type(self.token_type.as_deref()),
			expires_in: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
			scope: granted_scope(self.scope.as_deref(), requested),
			act_assertion: None,
			issued_at: OffsetDateTime::now_utc(),
		}
	}
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
}

/// Sends one dual-subject token request and decodes the success body.
///
/// Non-success statuses become [`TokenRequestError::Status`] carrying only the OAuth `error`
/// code, never the raw body.
pub(crate) async fn post_token_request<C, M>(
	http_client: &C,
	error_mapper: &M,
	vendor: Vendor,
	url: &Url,
	body: TokenRequestBody,
) -> Result<TokenEndpointResponse>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let meta = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(meta.clone());
	let request = body.into_http_request(url)?;
	let response = handle
		.call(request)
		.await
		.map_err(|e| error_mapper.map_transport_error(vendor, meta.take().as_ref(), e))?;
	let status = response.status().as_u16();

	if !response.status().is_success() {
		let retry_after = meta_retry_after(meta.take().as_ref());

		return Err(TokenRequestError::Status {
			status_code: status,
			message: oauth_error_code(response.body()),
			retry_after,
		}
		.into());
	}

	let parsed: TokenEndpointResponse =
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(response.body()))
			.map_err(|source| TokenRequestError::Parse { status_code: Some(status), source })?;

	if parsed.access_token.is_empty() {
		return Err(TokenRequestError::Unexpected {
			status_code: Some(status),
			message: "response carried an empty access_token".into(),
		}
		.into());
	}

	Ok(parsed)
}

/// Standard client-credentials exchange built on the `oauth2` crate.
pub(crate) struct ClientCredentialsFacade<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	vendor: Vendor,
}
impl<C, M> ClientCredentialsFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_config(
		config: &ProviderConfig,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_url.to_string())
			.map_err(|source| ConfigError::InvalidUrl { field: "token_url", source })?;
		let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret().expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client, error_mapper, vendor: config.vendor })
	}

	pub(crate) async fn exchange(
		&self,
		scope: &str,
		requested: &ScopeSet,
	) -> Result<NormalizedTokenResult> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_scope(Scope::new(scope.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|err| {
				map_request_error(self.vendor, meta.take(), err, self.error_mapper.as_ref())
			})?;

		Ok(normalize_facade_response(response, requested))
	}
}

fn normalize_facade_response(
	response: BasicTokenResponse,
	requested: &ScopeSet,
) -> NormalizedTokenResult {
	let granted = response
		.scopes()
		.and_then(|scopes| ScopeSet::new(scopes.iter().map(|scope| scope.to_string())).ok())
		.filter(|scopes| !scopes.is_empty())
		.unwrap_or_else(|| requested.clone());

	NormalizedTokenResult {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		token_type: normalize_token_type(Some(response.token_type().as_ref())),
		expires_in: response.expires_in().map_or(DEFAULT_EXPIRES_IN, |lifetime| lifetime.as_secs()),
		scope: granted,
		act_assertion: None,
		issued_at: OffsetDateTime::now_utc(),
	}
}

fn map_request_error<E, M>(
	vendor: Vendor,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	if let Some(status_code) = meta_status(meta_ref).filter(|status| !(200..300).contains(status))
	{
		let message = match &err {
			RequestTokenError::ServerResponse(response) =>
				sanitize_error_code(response.error().as_ref()),
			_ => GENERIC_FAILURE.into(),
		};

		return TokenRequestError::Status {
			status_code,
			message,
			retry_after: meta_retry_after(meta_ref),
		}
		.into();
	}

	match err {
		RequestTokenError::ServerResponse(response) => TokenRequestError::Unexpected {
			status_code: meta_status(meta_ref),
			message: sanitize_error_code(response.error().as_ref()),
		}
		.into(),
		RequestTokenError::Request(error) => mapper.map_transport_error(vendor, meta_ref, error),
		RequestTokenError::Parse(source, _body) =>
			TokenRequestError::Parse { status_code: meta_status(meta_ref), source }.into(),
		RequestTokenError::Other(message) =>
			TokenRequestError::Unexpected { status_code: meta_status(meta_ref), message }.into(),
	}
}

fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TokenRequestError::timeout(err).into();
	}

	TokenRequestError::network(err).into()
}

fn oauth_error_code(body: &[u8]) -> String {
	serde_json::from_slice::<OAuthErrorBody>(body)
		.ok()
		.and_then(|parsed| parsed.error)
		.map(|code| sanitize_error_code(&code))
		.filter(|code| !code.is_empty())
		.unwrap_or_else(|| GENERIC_FAILURE.into())
}

fn sanitize_error_code(code: &str) -> String {
	code.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
		.take(MAX_ERROR_CODE_LEN)
		.collect()
}

fn normalize_token_type(raw: Option<&str>) -> String {
	match raw.map(str::trim) {
		None | Some("") => DEFAULT_TOKEN_TYPE.into(),
		Some(value) if value.eq_ignore_ascii_case(DEFAULT_TOKEN_TYPE) => DEFAULT_TOKEN_TYPE.into(),
		Some(value) => value.to_owned(),
	}
}

fn granted_scope(raw: Option<&str>, requested: &ScopeSet) -> ScopeSet {
	raw.and_then(|value| ScopeSet::from_str(value).ok())
		.filter(|scopes| !scopes.is_empty())
		.unwrap_or_else(|| requested.clone())
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn requested() -> ScopeSet {
		ScopeSet::new(["read"]).expect("Scope fixture should be valid.")
	}

	#[test]
	fn error_codes_are_sanitized() {
		assert_eq!(oauth_error_code(br#"{"error":"invalid_client"}"#), "invalid_client");
		assert_eq!(
			oauth_error_code(br#"{"error":"bad <script>","error_description":"secret=abc"}"#),
			"badscript"
		);
		assert_eq!(oauth_error_code(b"<html>gateway</html>"), GENERIC_FAILURE);
		assert_eq!(oauth_error_code(b""), GENERIC_FAILURE);
		assert_eq!(sanitize_error_code(&"x".repeat(200)).len(), MAX_ERROR_CODE_LEN);
	}

	#[test]
	fn missing_fields_fall_back_to_defaults() {
		let response: TokenEndpointResponse =
			serde_json::from_str(r#"{"access_token":"abc"}"#).expect("Minimal body should parse.");
		let token = response.normalize(&requested());

		assert_eq!(token.access_token.expose(), "abc");
		assert_eq!(token.token_type, "Bearer");
		assert_eq!(token.expires_in, DEFAULT_EXPIRES_IN);
		assert_eq!(token.scope, requested());
		assert!(token.act_assertion.is_none());
	}

	#[test]
	fn provider_values_are_kept() {
		let response: TokenEndpointResponse = serde_json::from_str(
			r#"{"access_token":"abc","token_type":"bearer","expires_in":300,"scope":"read write"}"#,
		)
		.expect("Full body should parse.");
		let token = response.normalize(&requested());

		assert_eq!(token.token_type, "Bearer");
		assert_eq!(token.expires_in, 300);
		assert_eq!(token.scope.normalized(), "read write");
	}

	#[test]
	fn form_bodies_are_url_encoded() {
		let body = TokenRequestBody::Form(vec![
			("grant_type", "client_credentials".into()),
			("act", r#"{"sub":"alice"}"#.into()),
		]);
		let url = Url::parse("https://kc.example.com/token").expect("URL fixture should parse.");
		let request = body.into_http_request(&url).expect("Request should build.");
		let encoded = String::from_utf8(request.body().clone()).expect("Body should be UTF-8.");

		assert_eq!(
			request.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/x-www-form-urlencoded")
		);
		assert_eq!(encoded, "grant_type=client_credentials&act=%7B%22sub%22%3A%22alice%22%7D");
	}

	#[test]
	fn json_bodies_keep_nested_act() {
		let body = TokenRequestBody::Json(serde_json::json!({ "act": { "sub": "alice" } }));
		let encoded = body.encode().expect("JSON body should encode.");

		assert_eq!(encoded, br#"{"act":{"sub":"alice"}}"#);
	}

	#[test]
	fn facade_builds_from_config() {
		let config = ProviderConfig::builder(Vendor::EntraId)
			.token_url("https://login.example.com/tenant/oauth2/v2.0/token")
			.client_id("finance-agent")
			.client_secret("s3cr3t-value")
			.scope("https://api.example.com/.default")
			.app_private_key_path("/keys/app.pem")
			.app_id("app-123")
			.act_audience("https://api.example.com")
			.build()
			.expect("Entra ID config should build.");
		let http_client = Arc::new(ReqwestHttpClient::new().expect("Client should build."));

		assert!(
			ClientCredentialsFacade::from_config(
				&config,
				http_client,
				Arc::new(ReqwestTransportErrorMapper),
			)
			.is_ok()
		);
	}
}
