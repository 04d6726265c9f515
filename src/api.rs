//! Protected-resource calls carrying dual-subject tokens.

// crates.io
use reqwest::{Method, Response};
// self
use crate::{
	_prelude::*,
	auth::NormalizedTokenResult,
	error::{ConfigError, TransportError},
	ext::{HeaderSigner, RequestSignerExt},
	http::{self, ReqwestHttpClient, RetryPolicy},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	redact,
};

/// HTTPS-only client for the API a token was issued for.
///
/// Headers come from [`HeaderSigner`], so hybrid-assertion tokens automatically carry
/// `X-Act-Assertion`. Transient statuses and connect/timeout failures are retried under the
/// configured [`RetryPolicy`]; any other response is returned to the caller as-is.
#[derive(Clone, Debug)]
pub struct ProtectedResourceClient {
	client: ReqwestClient,
	retry: RetryPolicy,
	signer: HeaderSigner,
}
impl ProtectedResourceClient {
	/// Builds a client with a 10s timeout and redirects disabled.
	pub fn new() -> Result<Self> {
		Ok(Self::with_client(ReqwestHttpClient::new()?.0))
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, retry: RetryPolicy::default(), signer: HeaderSigner }
	}

	/// Overrides the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Sends `method api_url` with the token headers and an optional JSON body.
	pub async fn call(
		&self,
		token: &NormalizedTokenResult,
		method: Method,
		api_url: &str,
		json: Option<&serde_json::Value>,
	) -> Result<Response> {
		const KIND: FlowKind = FlowKind::ResourceCall;

		let span = FlowSpan::new(KIND, "api");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		span.record_subject(&redact::hash_url(api_url));

		let result = span.instrument(self.send_with_retry(token, method, api_url, json)).await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn send_with_retry(
		&self,
		token: &NormalizedTokenResult,
		method: Method,
		api_url: &str,
		json: Option<&serde_json::Value>,
	) -> Result<Response> {
		let url = Url::parse(api_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "api_url", source })?;

		if url.scheme() != "https" {
			return Err(ConfigError::InsecureUrl { field: "api_url" }.into());
		}

		let mut retry = 0;

		loop {
			let request = self.client.request(method.clone(), url.clone());
			let request = self.signer.attach_token(request, token)?;
			let request = match json {
				Some(body) => request.json(body),
				None => request,
			};
			let can_retry = retry < self.retry.max_retries;

			match request.send().await {
				Ok(response)
					if can_retry && http::is_transient_status(response.status().as_u16()) =>
				{
					retry += 1;

					let hint = http::parse_retry_after(response.headers());

					self.retry.pause(FlowKind::ResourceCall, retry, hint).await;
				},
				Ok(response) => return Ok(response),
				Err(e) if can_retry && (e.is_timeout() || e.is_connect()) => {
					retry += 1;

					self.retry.pause(FlowKind::ResourceCall, retry, None).await;
				},
				Err(e) => return Err(TransportError::from(e).into()),
			}
		}
	}
}
