//! Strongly typed agent identifiers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const AGENT_ID_MAX_LEN: usize = 256;

/// Error returned when agent identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Agent identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Agent identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed byte length.
	#[error("Agent identifier exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		Error::invalid_claim(e.to_string().trim_end_matches('.'))
	}
}

/// OAuth client identifier of the agent, sent as the token `sub`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);
impl AgentId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		Self::try_from(value.into())
	}

	/// Borrows the identifier.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for AgentId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		if value.is_empty() {
			return Err(IdentifierError::Empty);
		}
		if value.chars().any(char::is_whitespace) {
			return Err(IdentifierError::ContainsWhitespace);
		}
		if value.len() > AGENT_ID_MAX_LEN {
			return Err(IdentifierError::TooLong { max: AGENT_ID_MAX_LEN });
		}

		Ok(Self(value))
	}
}
impl From<AgentId> for String {
	fn from(value: AgentId) -> Self {
		value.0
	}
}
impl FromStr for AgentId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Deref for AgentId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AgentId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for AgentId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for AgentId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Agent({})", self.0)
	}
}
impl Display for AgentId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
