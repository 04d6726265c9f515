//! Log-safe renderings of identifiers and URLs.
//!
//! Every identifier that reaches a span field or log line passes through
//! [`sanitize_identifier`] first.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ActClaim};

const DIGEST_HEX_LEN: usize = 12;

/// Replaces an identifier with a category prefix and a truncated SHA-256 digest.
///
/// Emails become `user_…`, Okta-style client ids (`0oa…`) become `app_…`, everything else
/// becomes `id_…`. Empty input renders as `unknown`.
pub fn sanitize_identifier(identifier: &str) -> String {
	if identifier.is_empty() {
		return "unknown".into();
	}

	let prefix = if identifier.contains('@') {
		"user"
	} else if identifier.starts_with("0oa") {
		"app"
	} else {
		"id"
	};

	format!("{prefix}_{}", short_digest(identifier))
}

/// Replaces a URL with a truncated SHA-256 digest.
pub fn hash_url(url: &str) -> String {
	format!("url_{}", short_digest(url))
}

fn short_digest(value: &str) -> String {
	let digest = Sha256::digest(value.as_bytes());
	let mut hex = String::with_capacity(DIGEST_HEX_LEN);

	for byte in digest.iter().take(DIGEST_HEX_LEN / 2) {
		hex.push_str(&format!("{byte:02x}"));
	}

	hex
}

/// Summary of an act claim that is safe to log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActSummary {
	/// Sanitized subject.
	pub sub_hash: String,
	/// Whether the claim carries an email.
	pub has_email: bool,
	/// Whether the claim carries a display name.
	pub has_name: bool,
}
impl From<&ActClaim> for ActSummary {
	fn from(act: &ActClaim) -> Self {
		Self {
			sub_hash: sanitize_identifier(act.sub()),
			has_email: act.email().is_some(),
			has_name: act.name().is_some(),
		}
	}
}
impl Display for ActSummary {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} (email: {}, name: {})", self.sub_hash, self.has_email, self.has_name)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_are_categorized_and_hashed() {
		let user = sanitize_identifier("alice@corp.example");
		let app = sanitize_identifier("0oa1b2c3d4");
		let other = sanitize_identifier("agent-finance");

		assert!(user.starts_with("user_"));
		assert!(app.starts_with("app_"));
		assert!(other.starts_with("id_"));
		assert_eq!(other.len(), "id_".len() + DIGEST_HEX_LEN);
		assert!(!user.contains("alice"));
		assert_eq!(sanitize_identifier(""), "unknown");
	}

	#[test]
	fn hashing_is_stable() {
		// SHA-256("abc") = ba7816bf8f01cfea...
		assert_eq!(sanitize_identifier("abc"), "id_ba7816bf8f01");
		assert_eq!(hash_url("abc"), "url_ba7816bf8f01");
	}

	#[test]
	fn summary_omits_values() {
		let act = ActClaim::new("alice@corp.example")
			.expect("Alice should be valid.")
			.with_email("alice@corp.example");
		let summary = ActSummary::from(&act);

		assert!(summary.has_email);
		assert!(!summary.has_name);
		assert!(!summary.to_string().contains("corp.example"));
	}
}
