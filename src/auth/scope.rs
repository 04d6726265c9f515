//! Requested and granted OAuth scopes.

// std
use std::collections::BTreeSet;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// No scope was supplied where at least one is required.
	#[error("At least one scope is required.")]
	Missing,
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}
impl From<ScopeValidationError> for Error {
	fn from(e: ScopeValidationError) -> Self {
		Error::invalid_claim(e.to_string().trim_end_matches('.'))
	}
}

/// Deduplicated, sorted set of OAuth scopes.
///
/// Providers receive the space-delimited [`normalized`](Self::normalized) form, so two
/// requests for the same scopes always produce identical wire bodies.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}

			set.insert(owned);
		}

		Ok(Self(set.into_iter().collect()))
	}

	/// Like [`new`](Self::new) but rejects an empty result.
	pub fn non_empty<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let set = Self::new(scopes)?;

		if set.is_empty() {
			return Err(ScopeValidationError::Missing);
		}

		Ok(set)
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited wire representation.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a space-delimited scope string, as found in token responses.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(self.iter())
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_order_and_duplicates() {
		let lhs = ScopeSet::new(["write", "read", "read"]).expect("Scope set should be valid.");
		let rhs = ScopeSet::new(["read", "write"]).expect("Scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "read write");
		assert!(lhs.contains("write"));
		assert!(!lhs.contains("admin"));
	}

	#[test]
	fn invalid_entries_are_rejected() {
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new(["read write"]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert_eq!(ScopeSet::non_empty(Vec::<String>::new()), Err(ScopeValidationError::Missing));
	}

	#[test]
	fn response_scope_strings_parse() {
		let scopes = ScopeSet::from_str(" read  write ").expect("Scope string should parse.");

		assert_eq!(scopes.iter().collect::<Vec<_>>(), vec!["read", "write"]);
		assert!(ScopeSet::from_str("").expect("Empty string should parse.").is_empty());
	}

	#[test]
	fn missing_scopes_become_invalid_claim() {
		let err: Error = ScopeValidationError::Missing.into();

		assert!(matches!(
			err,
			Error::InvalidClaim { ref reason } if reason == "At least one scope is required"
		));
	}
}
