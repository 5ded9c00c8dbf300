//! Redirect URI Validator.

// self
use crate::_prelude::*;

/// Exact-match check against the single canonical callback URI.
///
/// No normalization is applied: scheme, host, path, query, and trailing slashes must all be
/// byte-identical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectValidator {
	canonical: String,
}
impl RedirectValidator {
	/// Creates a validator for `canonical`.
	pub fn new(canonical: impl Into<String>) -> Self {
		Self { canonical: canonical.into() }
	}

	/// Canonical callback URI.
	pub fn canonical(&self) -> &str {
		&self.canonical
	}

	/// Fails with [`Error::RedirectMismatch`] unless `uri` equals the canonical URI.
	pub fn validate(&self, uri: &str) -> Result<()> {
		if uri == self.canonical {
			return Ok(());
		}

		Err(Error::RedirectMismatch { expected: self.canonical.clone(), actual: uri.to_owned() })
	}
}
