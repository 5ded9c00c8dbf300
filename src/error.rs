//! Relay-level error types shared by the codec, resolver, exchange, and reporting stages.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ScopeValidationError, TokenSetBuilderError},
	provider::{ProviderDescriptorError, ProviderErrorKind},
	resolve::ResolutionError,
	state::DecodeError,
	store::StoreError,
	upstream::ReportError,
};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// Every variant up to and including [`Error::Exchange`] aborts a callback. [`Error::Report`]
/// is only surfaced by the reporter itself; the orchestrator logs and swallows it.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The `state` parameter matched neither accepted grammar.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Session or connection definition is absent (stale or forged callback).
	#[error("{entity} `{key}` was not found.")]
	NotFound {
		/// Kind of record that was looked up.
		entity: &'static str,
		/// Lookup key.
		key: String,
	},
	/// No usable client credential could be resolved.
	#[error(transparent)]
	Resolution(#[from] ResolutionError),
	/// The redirect URI differs from the canonical callback URI.
	#[error("Redirect URI `{actual}` does not match the registered callback URI.")]
	RedirectMismatch {
		/// Canonical callback URI.
		expected: String,
		/// URI presented by the callback.
		actual: String,
	},
	/// Provider or upstream platform rejected the grant.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// Outcome report failed (never fatal for a callback).
	#[error(transparent)]
	Report(#[from] ReportError),
	/// Storage-layer failure other than a missing record.
	#[error("{0}")]
	Storage(#[source] StoreError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Inbound request is missing required parameters.
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
}
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::NotFound { entity, key } => Self::NotFound { entity, key },
			other => Self::Storage(other),
		}
	}
}

/// Rejection returned by the identity provider or the upstream platform for a grant.
///
/// `details` carries the decoded error body verbatim so failures can be diagnosed without
/// re-running the callback.
#[derive(Clone, Debug, ThisError)]
#[error("Exchange was rejected: {message}.")]
pub struct ExchangeError {
	/// Classification produced by the provider strategy.
	pub kind: ProviderErrorKind,
	/// HTTP status code, when available.
	pub status: Option<u16>,
	/// Short summary of the failure.
	pub message: String,
	/// Decoded error body (JSON, or a JSON string when the body was not JSON).
	pub details: JsonValue,
}
impl ExchangeError {
	/// Decodes a raw error body into a JSON value, falling back to a string.
	pub fn decode_body(body: &[u8]) -> JsonValue {
		serde_json::from_slice(body)
			.unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor is invalid.
	#[error(transparent)]
	InvalidDescriptor(#[from] ProviderDescriptorError),
	/// A configured or resolved URL cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A `.env` file exists but could not be read.
	#[error("Environment file `{}` could not be loaded.", path.display())]
	EnvFile {
		/// File that failed to load.
		path: std::path::PathBuf,
		/// Underlying dotenv failure.
		#[source]
		source: dotenvy::Error,
	},
	/// Required configuration key is absent.
	#[error("Configuration key `{key}` is required.")]
	MissingKey {
		/// Environment key (without prefix).
		key: &'static str,
	},
	/// Configuration value cannot be interpreted.
	#[error("Configuration key `{key}` is invalid: {reason}.")]
	InvalidValue {
		/// Environment key (without prefix).
		key: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Configured scopes cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// Token endpoint response could not be turned into a token set.
	#[error(transparent)]
	InvalidTokenSet(#[from] TokenSetBuilderError),
	/// Token set being refreshed carries no refresh token.
	#[error("Token set is missing a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Builds an [`ConfigError::InvalidUrl`] for `value`.
	pub fn invalid_url(value: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { value: value.into(), source }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned an unexpected but non-fatal response.
	#[error("Endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered 2xx with a body that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Logical endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised against `endpoint`.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_not_found_maps_to_not_found() {
		let err: Error =
			StoreError::NotFound { entity: "embed session", key: "session_id::a::b".into() }.into();

		assert!(matches!(err, Error::NotFound { entity: "embed session", .. }));
		assert!(err.to_string().contains("session_id::a::b"));
	}

	#[test]
	fn store_backend_failure_keeps_source() {
		let err: Error = StoreError::Backend { message: "disk unreachable".into() }.into();

		assert!(matches!(err, Error::Storage(_)));

		let source =
			StdError::source(&err).expect("Storage errors should expose the store error as source.");

		assert!(source.to_string().contains("disk unreachable"));
	}

	#[test]
	fn decode_body_keeps_json_and_wraps_text() {
		assert_eq!(
			ExchangeError::decode_body(br#"{"error":"invalid_grant"}"#),
			serde_json::json!({ "error": "invalid_grant" })
		);
		assert_eq!(
			ExchangeError::decode_body(b"Bad Gateway"),
			JsonValue::String("Bad Gateway".into())
		);
	}
}
