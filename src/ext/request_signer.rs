//! Request signing contracts that let callers attach dual-subject tokens to arbitrary HTTP
//! clients.

// crates.io
use oauth2::{
	HttpRequest,
	http::{HeaderMap, HeaderName, HeaderValue, header::AUTHORIZATION},
};
// self
use crate::{_prelude::*, auth::NormalizedTokenResult, error::ConfigError};

/// Header carrying the secondary act assertion of hybrid-assertion providers.
pub const ACT_ASSERTION_HEADER: &str = "X-Act-Assertion";

/// Describes how to attach a [`NormalizedTokenResult`] to an outbound request without
/// constraining the HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects the token headers.
	fn attach_token(
		&self,
		request: Request,
		token: &NormalizedTokenResult,
	) -> Result<Request, Error>;
}

/// Builds the headers a protected resource expects for `token`.
///
/// Always sets `Authorization: Bearer <access_token>`; adds [`ACT_ASSERTION_HEADER`] when the
/// token came with a secondary act assertion. Values are marked sensitive.
pub fn token_headers(token: &NormalizedTokenResult) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(
		AUTHORIZATION,
		sensitive_value("access_token", &format!("Bearer {}", token.access_token.expose()))?,
	);

	if let Some(assertion) = &token.act_assertion {
		headers.insert(
			HeaderName::from_static("x-act-assertion"),
			sensitive_value("act_assertion", assertion.expose())?,
		);
	}

	Ok(headers)
}

fn sensitive_value(field: &'static str, raw: &str) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(raw)
		.map_err(|_| ConfigError::invalid_value(field, "not a valid header value"))?;

	value.set_sensitive(true);

	Ok(value)
}

/// Signer backed by [`token_headers`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderSigner;
impl RequestSignerExt<HttpRequest, Error> for HeaderSigner {
	fn attach_token(
		&self,
		mut request: HttpRequest,
		token: &NormalizedTokenResult,
	) -> Result<HttpRequest> {
		request.headers_mut().extend(token_headers(token)?);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, Error> for HeaderSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &NormalizedTokenResult,
	) -> Result<reqwest::RequestBuilder> {
		Ok(request.headers(token_headers(token)?))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{Method, Request};
	// self
	use super::*;
	use crate::auth::{ScopeSet, TokenSecret};

	fn token(act_assertion: Option<&str>) -> NormalizedTokenResult {
		NormalizedTokenResult {
			access_token: TokenSecret::new("at-123"),
			token_type: "Bearer".into(),
			expires_in: 3600,
			scope: ScopeSet::new(["read"]).expect("Scope fixture should be valid."),
			act_assertion: act_assertion.map(TokenSecret::new),
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	#[test]
	fn direct_tokens_only_set_authorization() {
		let headers = token_headers(&token(None)).expect("Headers should build.");

		assert_eq!(headers.len(), 1);
		assert_eq!(headers[AUTHORIZATION], "Bearer at-123");
		assert!(headers[AUTHORIZATION].is_sensitive());
	}

	#[test]
	fn hybrid_tokens_also_carry_the_assertion() {
		let request = Request::builder()
			.method(Method::GET)
			.uri("https://api.example.com/reports")
			.body(Vec::new())
			.expect("Request fixture should build.");
		let signed = HeaderSigner
			.attach_token(request, &token(Some("eyJ.assertion.sig")))
			.expect("Signing should succeed.");

		assert_eq!(signed.headers()[AUTHORIZATION], "Bearer at-123");
		assert_eq!(signed.headers()[ACT_ASSERTION_HEADER], "eyJ.assertion.sig");
	}

	#[test]
	fn control_characters_are_rejected() {
		let mut bad = token(None);

		bad.access_token = TokenSecret::new("at\n123");

		assert!(matches!(
			token_headers(&bad),
			Err(Error::Config(ConfigError::InvalidValue { field: "access_token", .. }))
		));
	}
}
