//! Dual-subject OAuth tokens for AI agents.
//!
//! One token request binds the agent (`sub`) and the human it acts for (`act`). Signed
//! short-lived assertions carry the human's identity across process boundaries, and every
//! supported identity provider answers through the same normalized result.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[cfg(feature = "reqwest")] pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod redact;
pub mod replay;
pub mod sender;
pub mod verifier;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ActClaim,
		http::{ReqwestHttpClient, RetryPolicy},
		replay::{MemoryReplayStore, ReplayStore},
		sender::HybridSender,
		verifier::OutOfSessionVerifier,
	};

	/// PKCS#8 PEM private key the fixture application signs assertions with.
	pub const APP_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/app_private.pem");
	/// SPKI PEM public key matching [`APP_PRIVATE_KEY_PEM`].
	pub const APP_PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/app_public.pem");
	/// Unrelated PKCS#8 PEM private key used to forge assertions.
	pub const ROGUE_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/rogue_private.pem");
	/// Filesystem path of [`APP_PRIVATE_KEY_PEM`].
	pub const APP_PRIVATE_KEY_PATH: &str =
		concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app_private.pem");
	/// Filesystem path of [`APP_PUBLIC_KEY_PEM`].
	pub const APP_PUBLIC_KEY_PATH: &str =
		concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app_public.pem");
	/// Agent endpoint used as the audience of fixture assertions.
	pub const AGENT_ENDPOINT: &str = "https://agent.example.com";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_client(test_reqwest_client())
	}

	/// Raw reqwest client with certificate verification disabled for `httpmock` servers.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Retry policy with zero backoff so retry tests finish instantly.
	pub fn instant_retry_policy(max_retries: u32) -> RetryPolicy {
		RetryPolicy::default()
			.with_max_retries(max_retries)
			.with_initial_backoff(Duration::ZERO)
			.with_max_backoff(Duration::ZERO)
	}

	/// Sender loaded with the fixture application key.
	pub fn test_sender() -> HybridSender {
		HybridSender::from_rsa_pem(APP_PRIVATE_KEY_PEM.as_bytes())
			.expect("Fixture private key should load.")
	}

	/// Sender loaded with a key the fixture verifier does not trust.
	pub fn rogue_sender() -> HybridSender {
		HybridSender::from_rsa_pem(ROGUE_PRIVATE_KEY_PEM.as_bytes())
			.expect("Rogue private key should load.")
	}

	/// Verifier trusting the fixture application key, backed by a fresh in-memory replay store.
	pub fn test_verifier() -> (OutOfSessionVerifier, Arc<MemoryReplayStore>) {
		let store_backend = Arc::new(MemoryReplayStore::default());
		let store: Arc<dyn ReplayStore> = store_backend.clone();
		let verifier = OutOfSessionVerifier::from_rsa_pem(APP_PUBLIC_KEY_PEM.as_bytes(), store)
			.expect("Fixture public key should load.");

		(verifier, store_backend)
	}

	/// Act claim for the `alice` fixture principal.
	pub fn alice() -> ActClaim {
		ActClaim::new("alice").expect("Alice fixture should be a valid act claim.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
