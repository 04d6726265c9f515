//! The `act` claim identifying the human principal an agent works for.

// self
use crate::{_prelude::*, redact};

/// Human principal on whose behalf the agent acts.
///
/// A value of this type always has a non-blank `sub`; optional fields are omitted from the
/// wire form when absent. `Debug` hashes the subject and hides the email so claims can be
/// logged without leaking PII.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawActClaim")]
pub struct ActClaim {
	sub: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	name: Option<String>,
}
impl ActClaim {
	/// Creates a claim for the given subject.
	///
	/// Fails with [`Error::InvalidClaim`] when `sub` is empty or whitespace.
	pub fn new(sub: impl Into<String>) -> Result<Self> {
		let sub = sub.into();

		if sub.trim().is_empty() {
			return Err(Error::invalid_claim("act.sub is required"));
		}

		Ok(Self { sub, email: None, name: None })
	}

	/// Attaches the principal's email address.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Attaches the principal's display name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Stable principal identifier.
	pub fn sub(&self) -> &str {
		&self.sub
	}

	/// Email address, if known.
	pub fn email(&self) -> Option<&str> {
		self.email.as_deref()
	}

	/// Display name, if known.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Compact JSON text of the claim, as sent in form-encoded token requests.
	pub fn to_json_string(&self) -> Result<String> {
		serde_json::to_string(self).map_err(|e| crate::error::ConfigError::RequestBody(e).into())
	}
}
impl Debug for ActClaim {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActClaim")
			.field("sub", &redact::sanitize_identifier(&self.sub))
			.field("email", &self.email.as_ref().map(|_| "<redacted>"))
			.field("name", &self.name.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}
impl TryFrom<RawActClaim> for ActClaim {
	type Error = Error;

	fn try_from(raw: RawActClaim) -> Result<Self> {
		let claim = Self::new(raw.sub.unwrap_or_default())?;

		Ok(Self { email: raw.email, name: raw.name, ..claim })
	}
}

/// Unvalidated wire form of an act claim.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct RawActClaim {
	#[serde(default)]
	pub(crate) sub: Option<String>,
	#[serde(default)]
	pub(crate) email: Option<String>,
	#[serde(default)]
	pub(crate) name: Option<String>,
}
