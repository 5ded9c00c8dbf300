//! Inbound HTTP surface: `POST /process-callback`, `GET /callback`, `GET /authorize`, and
//! `GET /health`.

pub mod cli;
pub mod error;

pub use cli::*;
pub use error::*;

// crates.io
use axum::{
	Json, Router,
	extract::{Query, State, rejection::JsonRejection},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, IdentifierError, PlatformType, SessionId},
	config::RelayConfig,
	error::TransportError,
	flows::{CallbackOutcome, CallbackRequest, ReqwestRelay},
	state::CallbackState,
};

/// Body accepted by `POST /process-callback`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCallbackBody {
	/// Raw state value returned by the provider.
	pub session_id: Option<String>,
	/// Authorization code.
	pub code: Option<String>,
	/// Caller-supplied client id.
	pub client_id: Option<String>,
	/// Caller-supplied redirect URI.
	pub redirect_uri: Option<String>,
	/// Platform used when the state carries none.
	#[serde(rename = "type")]
	pub platform_type: Option<String>,
	/// Shared secret used when the state carries none.
	pub secret: Option<String>,
}

/// Query string of the provider redirect hitting `GET /callback`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackQuery {
	/// Authorization code.
	pub code: Option<String>,
	/// Raw state value.
	pub state: Option<String>,
	/// OAuth error code when the user or provider aborted the flow.
	pub error: Option<String>,
	/// Human-readable companion of `error`.
	pub error_description: Option<String>,
}

/// Query string of `GET /authorize`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeQuery {
	/// Existing session; a fresh one is generated when absent.
	pub session_id: Option<String>,
	/// Platform carried in the state.
	#[serde(rename = "type")]
	pub platform_type: Option<String>,
	/// Shared secret carried in the state.
	pub secret: Option<String>,
	/// Client id placed in the authorize URL.
	pub client_id: Option<String>,
}

/// Builds the router serving `relay`.
pub fn router(relay: ReqwestRelay) -> Router {
	Router::new()
		.route("/process-callback", post(process_callback))
		.route("/callback", get(provider_callback))
		.route("/authorize", get(authorize))
		.route("/health", get(health))
		.with_state(relay)
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<()> {
	let store = config.open_store()?;
	let relay = config.build_relay(store)?;
	let listener = TcpListener::bind(config.bind_addr).await.map_err(TransportError::from)?;

	tracing::info!(
		bind_addr = %config.bind_addr,
		exchange_mode = %relay.exchange_mode(),
		callback_uri = relay.callback_uri(),
		"relay listening"
	);

	axum::serve(listener, router(relay))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(TransportError::from)?;

	tracing::info!("relay stopped");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");
	}
}

async fn process_callback(
	State(relay): State<ReqwestRelay>,
	body: Result<Json<ProcessCallbackBody>, JsonRejection>,
) -> Result<Response, ApiError> {
	let Json(body) = body?;
	let state = required(body.session_id, "sessionId")?;
	let code = required(body.code, "code")?;
	let mut request = CallbackRequest::new(state, code);

	request.client_id = optional(body.client_id, ClientId::new)?;
	request.platform_type = optional(body.platform_type, PlatformType::new)?;
	request.redirect_uri = body.redirect_uri.filter(|uri| !uri.trim().is_empty());

	if let Some(secret) = body.secret.filter(|s| !s.is_empty()) {
		request = request.with_secret(secret);
	}

	let outcome = relay.process_callback(request).await?;

	Ok(success(outcome))
}

async fn provider_callback(
	State(relay): State<ReqwestRelay>,
	Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
	if let Some(error) = query.error {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"Authorization was not granted.",
			serde_json::json!({ "error": error, "error_description": query.error_description }),
		));
	}

	let state = required(query.state, "state")?;
	let code = required(query.code, "code")?;
	let outcome = relay.process_callback(CallbackRequest::new(state, code)).await?;

	Ok(success(outcome))
}

async fn authorize(
	State(relay): State<ReqwestRelay>,
	Query(query): Query<AuthorizeQuery>,
) -> Result<Response, ApiError> {
	let session_id =
		optional(query.session_id, SessionId::new)?.unwrap_or_else(SessionId::generate);
	let mut state = CallbackState::new(session_id);

	if let Some(platform) = optional(query.platform_type, PlatformType::new)? {
		state = state.with_platform(platform);
	}
	if let Some(secret) = query.secret.filter(|s| !s.is_empty()) {
		state = state.with_secret(secret);
	}

	let client_id = optional(query.client_id, ClientId::new)?;
	let url = relay.authorization_url(&state, client_id.as_ref())?;

	Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response())
}

async fn health() -> Json<JsonValue> {
	Json(serde_json::json!({ "status": "ok" }))
}

fn success(outcome: CallbackOutcome) -> Response {
	Json(serde_json::json!({ "success": true, "data": outcome.data, "reported": outcome.reported }))
		.into_response()
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
	value
		.filter(|v| !v.trim().is_empty())
		.ok_or_else(|| Error::InvalidRequest { reason: format!("{field} is required") }.into())
}

fn optional<T>(
	value: Option<String>,
	parse: impl FnOnce(String) -> Result<T, IdentifierError>,
) -> Result<Option<T>, ApiError> {
	value
		.filter(|v| !v.trim().is_empty())
		.map(|v| {
			parse(v).map_err(|e| {
				let reason = e.to_string().trim_end_matches('.').to_owned();

				Error::InvalidRequest { reason }.into()
			})
		})
		.transpose()
}
