//! Mapping heterogeneous session records onto an [`ActClaim`].

// self
use crate::{_prelude::*, auth::ActClaim};

const EMAIL_FIELDS: [&str; 4] = ["email", "user_email", "userPrincipalName", "mail"];
const SUBJECT_FIELDS: [&str; 3] = ["sub", "user_id", "oid"];
const NAME_FIELDS: [&str; 3] = ["name", "display_name", "displayName"];

/// Read-only view over a session record keyed by field name.
///
/// Implemented for the common string maps and for JSON objects so callers can pass whatever
/// their session layer already holds.
pub trait SessionFields {
	/// Returns the string value stored under `name`, if any.
	fn field(&self, name: &str) -> Option<&str>;
}
impl SessionFields for HashMap<String, String> {
	fn field(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}
impl SessionFields for BTreeMap<String, String> {
	fn field(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}
impl SessionFields for serde_json::Map<String, serde_json::Value> {
	fn field(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(serde_json::Value::as_str)
	}
}
impl SessionFields for serde_json::Value {
	fn field(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(serde_json::Value::as_str)
	}
}

/// Extracts the human principal from a session record.
///
/// An email-equivalent field (`email`, `user_email`, `userPrincipalName`, `mail`) is
/// required. The subject is the first of `sub`, `user_id`, `oid`, falling back to the email.
/// Blank values count as absent. Fails with [`Error::MissingIdentity`] when no email can be
/// found.
pub fn act_from_session<S>(session: &S) -> Result<ActClaim>
where
	S: ?Sized + SessionFields,
{
	let email = first_present(session, &EMAIL_FIELDS).ok_or(Error::MissingIdentity)?;
	let sub = first_present(session, &SUBJECT_FIELDS).unwrap_or(email);
	let mut claim = ActClaim::new(sub)?.with_email(email);

	if let Some(name) = first_present(session, &NAME_FIELDS) {
		claim = claim.with_name(name);
	}

	Ok(claim)
}

fn first_present<'a, S>(session: &'a S, names: &[&str]) -> Option<&'a str>
where
	S: ?Sized + SessionFields,
{
	names.iter().filter_map(|name| session.field(name)).find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	#[test]
	fn subject_fields_are_tried_in_order() {
		let claim = act_from_session(&record(&[
			("mail", "carol@corp.example"),
			("oid", "3"),
			("user_id", "2"),
		]))
		.expect("Session with user_id should map.");

		assert_eq!(claim.sub(), "2");
		assert_eq!(claim.email(), Some("carol@corp.example"));

		let claim =
			act_from_session(&record(&[("userPrincipalName", "carol@corp.example"), ("oid", "3")]))
				.expect("Session with oid should map.");

		assert_eq!(claim.sub(), "3");
	}

	#[test]
	fn email_and_name_variants_are_collected() {
		let claim = act_from_session(&record(&[
			("sub", "alice"),
			("user_email", "alice@corp.example"),
			("displayName", "Alice Doe"),
		]))
		.expect("Session should map.");

		assert_eq!(claim.sub(), "alice");
		assert_eq!(claim.email(), Some("alice@corp.example"));
		assert_eq!(claim.name(), Some("Alice Doe"));
	}

	#[test]
	fn email_stands_in_for_missing_subject() {
		let session = serde_json::json!({ "email": "bob@corp.example", "role": "analyst" });
		let claim = act_from_session(&session).expect("Email-only session should map.");

		assert_eq!(claim.sub(), "bob@corp.example");
		assert!(claim.name().is_none());
	}

	#[test]
	fn sessions_without_email_fail() {
		assert!(matches!(act_from_session(&record(&[])), Err(Error::MissingIdentity)));
		assert!(matches!(
			act_from_session(&record(&[("sub", "alice"), ("name", "Alice Doe")])),
			Err(Error::MissingIdentity)
		));
		assert!(matches!(
			act_from_session(&record(&[("sub", "alice"), ("email", "  ")])),
			Err(Error::MissingIdentity)
		));
		assert!(matches!(
			act_from_session(&serde_json::json!({ "email": 42 })),
			Err(Error::MissingIdentity)
		));
	}
}
