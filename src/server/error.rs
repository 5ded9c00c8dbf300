//! HTTP rendering of relay errors as `{message, details}`.

// crates.io
use axum::{
	Json,
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::_prelude::*;

/// Error response returned by every handler.
#[derive(Clone, Debug, Serialize)]
pub struct ApiError {
	/// HTTP status of the response.
	#[serde(skip)]
	pub status: StatusCode,
	/// Human-readable summary.
	pub message: String,
	/// Structured diagnostics; the provider's error body for rejected exchanges.
	pub details: JsonValue,
}
impl ApiError {
	/// Creates an error response.
	pub fn new(status: StatusCode, message: impl Into<String>, details: JsonValue) -> Self {
		Self { status, message: message.into(), details }
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		let status = status_for(&e);
		let details = match &e {
			Error::Exchange(exchange) => serde_json::json!({
				"kind": exchange.kind,
				"status": exchange.status,
				"body": exchange.details,
			}),
			Error::NotFound { entity, key } => serde_json::json!({ "entity": entity, "key": key }),
			Error::RedirectMismatch { expected, actual } =>
				serde_json::json!({ "expected": expected, "actual": actual }),
			Error::Transient(_) | Error::Transport(_) => match StdError::source(&e) {
				Some(source) => JsonValue::String(source.to_string()),
				None => JsonValue::Null,
			},
			_ => JsonValue::Null,
		};

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %e, "request failed");
		}

		Self::new(status, e.to_string(), details)
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "Request body is not valid JSON.", rejection.body_text().into())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(self)).into_response()
	}
}

/// HTTP status used for `e`.
pub fn status_for(e: &Error) -> StatusCode {
	match e {
		Error::InvalidRequest { .. } | Error::Decode(_) | Error::RedirectMismatch { .. } =>
			StatusCode::BAD_REQUEST,
		Error::NotFound { .. } => StatusCode::NOT_FOUND,
		Error::Resolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
		Error::Exchange(_) | Error::Transient(_) | Error::Transport(_) => StatusCode::BAD_GATEWAY,
		Error::Report(_) | Error::Storage(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::ExchangeError, provider::ProviderErrorKind, resolve::ResolutionError,
		state::DecodeError,
	};

	#[test]
	fn statuses_follow_the_error_taxonomy() {
		assert_eq!(
			status_for(&Error::InvalidRequest { reason: "code is required".into() }),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_for(&Error::Decode(DecodeError::UnrecognizedStateFormat)),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_for(&Error::NotFound { entity: "embed session", key: "k".into() }),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			status_for(&ResolutionError::NoPlatformType.into()),
			StatusCode::UNPROCESSABLE_ENTITY
		);
	}

	#[test]
	fn exchange_errors_carry_the_provider_body() {
		let err: Error = ExchangeError {
			kind: ProviderErrorKind::InvalidGrant,
			status: Some(400),
			message: "token endpoint rejected the grant".into(),
			details: serde_json::json!({ "error": "invalid_grant" }),
		}
		.into();
		let api = ApiError::from(err);

		assert_eq!(api.status, StatusCode::BAD_GATEWAY);
		assert_eq!(api.details["body"]["error"], "invalid_grant");
		assert_eq!(api.details["kind"], "invalid_grant");
		assert_eq!(api.details["status"], 400);
	}
}
