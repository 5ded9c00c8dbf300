//! Strongly typed identifiers enforced across the relay domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Literal prefix shared by every session identifier.
pub const SESSION_ID_PREFIX: &str = "session_id";
/// Separator used inside session identifiers and callback state strings.
pub const SEGMENT_SEPARATOR: &str = "::";

const IDENTIFIER_MAX_LEN: usize = 256;
const SESSION_NONCE_BYTES: usize = 8;
const SESSION_TOKEN_BYTES: usize = 16;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
	/// The identifier contains a character reserved by the state grammar.
	#[error("{kind} identifier contains the reserved sequence `{reserved}`.")]
	Reserved {
		/// Kind of identifier.
		kind: &'static str,
		/// Reserved sequence that was found.
		reserved: &'static str,
	},
	/// Session identifiers must read `session_id::<a>::<b>`.
	#[error("{kind} identifier must match `session_id::<a>::<b>`.")]
	Malformed {
		/// Kind of identifier.
		kind: &'static str,
	},
}

def_id! { SessionId, "Embed session key shaped `session_id::<a>::<b>`.", "Session", validate_session }
def_id! { PlatformType, "Connected platform name (for example `apaleo`).", "Platform", validate_segment }
def_id! { ClientId, "OAuth 2.0 client identifier.", "Client", validate_view }
def_id! {
	ConnectionDefinitionId,
	"Primary key of a connection definition record.",
	"ConnectionDefinition",
	validate_view
}

impl SessionId {
	/// Builds `session_id::<a>::<b>` from its two variable parts.
	pub fn from_parts(a: &str, b: &str) -> Result<Self, IdentifierError> {
		Self::new(format!("{SESSION_ID_PREFIX}{SEGMENT_SEPARATOR}{a}{SEGMENT_SEPARATOR}{b}"))
	}

	/// Generates a fresh, unguessable session identifier.
	pub fn generate() -> Self {
		let mut rng = rand::rng();
		let mut nonce = [0_u8; SESSION_NONCE_BYTES];
		let mut token = [0_u8; SESSION_TOKEN_BYTES];

		rng.fill(&mut nonce);
		rng.fill(&mut token);

		Self(format!(
			"{SESSION_ID_PREFIX}{SEGMENT_SEPARATOR}{}{SEGMENT_SEPARATOR}{}",
			URL_SAFE_NO_PAD.encode(nonce),
			URL_SAFE_NO_PAD.encode(token),
		))
	}

	/// Returns the two variable parts of the identifier.
	pub fn parts(&self) -> (&str, &str) {
		let rest = &self.0[SESSION_ID_PREFIX.len() + SEGMENT_SEPARATOR.len()..];

		rest.split_once(SEGMENT_SEPARATOR).unwrap_or((rest, ""))
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

fn validate_segment(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	if view.contains(SEGMENT_SEPARATOR) {
		return Err(IdentifierError::Reserved { kind, reserved: SEGMENT_SEPARATOR });
	}
	if view.contains('#') {
		return Err(IdentifierError::Reserved { kind, reserved: "#" });
	}

	Ok(())
}

fn validate_session(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	if view.contains('#') {
		return Err(IdentifierError::Reserved { kind, reserved: "#" });
	}

	let mut parts = view.split(SEGMENT_SEPARATOR);

	match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(SESSION_ID_PREFIX), Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() =>
			Ok(()),
		_ => Err(IdentifierError::Malformed { kind }),
	}
}
