//! Scope list requested from the identity provider.

// std
use std::slice::Iter;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// No scopes were supplied.
	#[error("At least one scope is required.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Ordered, de-duplicated scope list.
///
/// Declaration order is kept because some providers echo the `scope` parameter back on their
/// consent screen in the order received.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeSet(Vec<String>);
impl ScopeSet {
	/// Creates a scope list from any iterator; duplicates after the first occurrence are dropped.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				continue;
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}
			if !list.contains(&owned) {
				list.push(owned);
			}
		}

		if list.is_empty() {
			return Err(ScopeValidationError::Empty);
		}

		Ok(Self(list))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are present; validated lists are never empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in declaration order.
	pub fn iter(&self) -> Iter<'_, String> {
		self.0.iter()
	}

	/// Joins the scopes with `delimiter` for the `scope` request parameter.
	pub fn joined(&self, delimiter: char) -> String {
		let mut buf = String::new();

		for (idx, value) in self.0.iter().enumerate() {
			if idx > 0 {
				buf.push(delimiter);
			}

			buf.push_str(value);
		}

		buf
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined(' '))
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a whitespace- or comma-separated list.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split(|c: char| c == ',' || c.is_whitespace()))
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.0.serialize(serializer)
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
	fn parses_space_and_comma_lists_in_order() {
		let scopes = ScopeSet::from_str("offline_access setup.read,setup.write  setup.read")
			.expect("Mixed delimiter scope list should parse.");

		assert_eq!(scopes.len(), 3);
		assert_eq!(scopes.joined(' '), "offline_access setup.read setup.write");
		assert!(scopes.contains("setup.write"));
	}

	#[test]
	fn rejects_empty_and_padded_scopes() {
		assert_eq!(ScopeSet::from_str("  ,"), Err(ScopeValidationError::Empty));

		let err = ScopeSet::new(["folio read"]).expect_err("Embedded whitespace must be rejected.");

		assert!(matches!(err, ScopeValidationError::ContainsWhitespace { .. }));
	}

	#[test]
	fn serde_enforces_validation() {
		let scopes: ScopeSet = serde_json::from_str("[\"folio.read\",\"folio.write\"]")
			.expect("Scope array should deserialize.");

		assert_eq!(scopes.to_string(), "folio.read folio.write");
		assert!(serde_json::from_str::<ScopeSet>("[]").is_err());
	}
}
