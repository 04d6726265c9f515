//! Walks the out-of-session path end to end: the application signs the human's identity, the
//! agent verifies it, requests a dual-subject token from a mocked Keycloak realm, and calls the
//! protected API with it.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use agbac_broker::{
	api::ProtectedResourceClient,
	auth::{ActClaim, AgentId, ScopeSet},
	config::{ProviderConfig, Vendor},
	flows::OutOfSessionTokenRequester,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::VendorAdapter,
	replay::{MemoryReplayStore, ReplayStore},
	reqwest::{Client, Method},
	sender::HybridSender,
	verifier::OutOfSessionVerifier,
};

const APP_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/app_private.pem");
const APP_PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/app_public.pem");
const AGENT_ENDPOINT: &str = "https://agent.example.com";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_includes("act=");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/reports").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let insecure = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;

	// Application side: sign the human's identity for the agent.
	let sender = HybridSender::from_rsa_pem(APP_PRIVATE_KEY_PEM.as_bytes())?;
	let act = ActClaim::new("alice")?.with_email("alice@corp.example");
	let assertion = sender.prepare_out_of_session(&act, AGENT_ENDPOINT, 60)?;

	// Agent side: verify, then request a token on alice's behalf.
	let store: Arc<dyn ReplayStore> = Arc::new(MemoryReplayStore::default());
	let verifier = OutOfSessionVerifier::from_rsa_pem(APP_PUBLIC_KEY_PEM.as_bytes(), store)?;
	let config = ProviderConfig::builder(Vendor::Keycloak)
		.token_url(server.url("/token"))
		.client_id("finance-agent")
		.client_secret("demo-secret")
		.build()?;
	let adapter = <VendorAdapter<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		config,
		ReqwestHttpClient::with_client(insecure.clone()),
		ReqwestTransportErrorMapper,
	)?;
	let requester = OutOfSessionTokenRequester::new(verifier, adapter, AGENT_ENDPOINT)?;
	let token = requester
		.request_token(&AgentId::new("agent-1")?, assertion.expose(), &ScopeSet::new(["read"])?)
		.await?;

	println!("Dual-subject token expires in {}s.", token.expires_in);

	let response = ProtectedResourceClient::with_client(insecure)
		.call(&token, Method::GET, &server.url("/reports"), None)
		.await?;

	println!("Protected API answered {}.", response.status());

	let replay = requester.receive(assertion.expose()).await;

	println!("Replaying the assertion fails: {}.", replay.is_err());

	token_mock.assert_async().await;
	api_mock.assert_async().await;

	Ok(())
}
