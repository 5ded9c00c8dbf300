//! Callback `state` codec.
//!
//! The provider round-trips a single opaque `state` value, so it multiplexes the tenant session,
//! the originating platform, and an optional shared secret. Two grammars are accepted:
//!
//! - `session_id::<a>::<b>`: the whole string is the session id, no platform.
//! - `<platform>::session_id::<a>::<b>`: platform first, then the session id.
//!
//! Either form may carry `#<secret>`; everything after the first `#` is the secret and is removed
//! before the grammars are tried.

// self
use crate::{
	_prelude::*,
	auth::{PlatformType, SEGMENT_SEPARATOR, SESSION_ID_PREFIX, SessionId, TokenSecret},
};

const SECRET_DELIMITER: char = '#';

/// Failure to decode a `state` value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DecodeError {
	/// The value matched neither accepted grammar.
	#[error("State parameter has an unrecognized format.")]
	UnrecognizedStateFormat,
}

/// Parsed `state` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackState {
	/// Embed session that initiated the flow.
	pub session_id: SessionId,
	/// Originating platform; `None` for the bare session-id grammar.
	pub platform_type: Option<PlatformType>,
	/// Shared secret carried after `#`, if any.
	pub secret: Option<TokenSecret>,
}
impl CallbackState {
	/// Creates a state for `session_id` without platform or secret.
	pub fn new(session_id: SessionId) -> Self {
		Self { session_id, platform_type: None, secret: None }
	}

	/// Attaches the originating platform.
	pub fn with_platform(mut self, platform: PlatformType) -> Self {
		self.platform_type = Some(platform);

		self
	}

	/// Attaches a shared secret.
	pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(secret));

		self
	}

	/// Encodes the state using the platform grammar when a platform is present.
	pub fn encode(&self) -> String {
		let mut buf = match &self.platform_type {
			Some(platform) => format!("{platform}{SEGMENT_SEPARATOR}{}", self.session_id),
			None => self.session_id.to_string(),
		};

		if let Some(secret) = &self.secret {
			buf.push(SECRET_DELIMITER);
			buf.push_str(secret.expose());
		}

		buf
	}
}
impl FromStr for CallbackState {
	type Err = DecodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		decode(s)
	}
}

/// Decodes a raw `state` value.
///
/// An empty secret (`...#`) is treated as absent.
pub fn decode(state: &str) -> Result<CallbackState, DecodeError> {
	let (body, secret) = match state.split_once(SECRET_DELIMITER) {
		Some((body, secret)) => (body, (!secret.is_empty()).then(|| TokenSecret::new(secret))),
		None => (state, None),
	};
	let session_prefix = format!("{SESSION_ID_PREFIX}{SEGMENT_SEPARATOR}");

	if body.starts_with(&session_prefix) {
		let session_id =
			SessionId::new(body).map_err(|_| DecodeError::UnrecognizedStateFormat)?;

		return Ok(CallbackState { session_id, platform_type: None, secret });
	}

	let parts = body.split(SEGMENT_SEPARATOR).collect::<Vec<_>>();

	if parts.len() >= 4 && parts[1] == SESSION_ID_PREFIX {
		let session_id = SessionId::from_parts(parts[2], parts[3])
			.map_err(|_| DecodeError::UnrecognizedStateFormat)?;
		let platform =
			PlatformType::new(parts[0]).map_err(|_| DecodeError::UnrecognizedStateFormat)?;

		return Ok(CallbackState { session_id, platform_type: Some(platform), secret });
	}

	Err(DecodeError::UnrecognizedStateFormat)
}
