//! Calls to the upstream platform: the connection-creating code exchange and the outcome report.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{SessionId, TokenSecret},
	error::{ExchangeError, TransportError},
	flows::{CodeExchanger, ExchangeFuture, ExchangeMode, ExchangeRequest},
	http::ReqwestHttpClient,
	provider::ProviderErrorKind,
};

/// Header carrying the shared secret on upstream calls.
pub const SECRET_HEADER: &str = "X-Pica-Secret";
/// Entity label used when an embed session has no link token.
pub const LINK_TOKEN: &str = "link token";
/// Path appended to the upstream base URL for outcome reports.
pub const UPDATE_PATH: &str = "/public/v1/embed-tokens/update";

/// Boxed future returned by [`OutcomeReporter::report`].
pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReportError>> + 'a + Send>>;

/// Failure to deliver an outcome report. Never fatal for a callback.
#[derive(Debug, ThisError)]
pub enum ReportError {
	/// The update endpoint could not be reached.
	#[error("Outcome report could not be delivered.")]
	Transport(#[source] ReqwestError),
	/// The update endpoint answered with a non-2xx status.
	#[error("Outcome report was rejected with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Response body text.
		body: String,
	},
}

/// Records a finished exchange with the upstream platform.
pub trait OutcomeReporter
where
	Self: Send + Sync,
{
	/// Reports `outcome` as the connection result for `session_id`.
	fn report<'a>(&'a self, session_id: &'a SessionId, outcome: &'a JsonValue) -> ReportFuture<'a>;
}

/// Reporter that posts `{sessionId, response: {isConnected, connection}}` to the update endpoint.
#[derive(Clone, Debug)]
pub struct HttpOutcomeReporter {
	http: ReqwestHttpClient,
	endpoint: Url,
	shared_secret: Option<TokenSecret>,
}
impl HttpOutcomeReporter {
	/// Creates a reporter posting to `endpoint`.
	pub fn new(http: ReqwestHttpClient, endpoint: Url) -> Self {
		Self { http, endpoint, shared_secret: None }
	}

	/// Derives the update endpoint from the upstream base URL.
	pub fn from_base_url(http: ReqwestHttpClient, base_url: &Url) -> Result<Self, url::ParseError> {
		let base = base_url.as_str().trim_end_matches('/');

		Ok(Self::new(http, Url::parse(&format!("{base}{UPDATE_PATH}"))?))
	}

	/// Sends `secret` in the [`SECRET_HEADER`] header.
	pub fn with_shared_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.shared_secret = secret;

		self
	}

	/// Endpoint receiving reports.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}
impl OutcomeReporter for HttpOutcomeReporter {
	fn report<'a>(&'a self, session_id: &'a SessionId, outcome: &'a JsonValue) -> ReportFuture<'a> {
		Box::pin(async move {
			let payload = serde_json::json!({
				"sessionId": session_id,
				"response": { "isConnected": true, "connection": outcome },
			});
			let mut request = self.http.post(self.endpoint.clone()).json(&payload);

			if let Some(secret) = &self.shared_secret {
				request = request.header(SECRET_HEADER, secret.expose());
			}

			let response = request.send().await.map_err(ReportError::Transport)?;
			let status = response.status();

			if status.is_success() {
				return Ok(());
			}

			let body = response.text().await.unwrap_or_default();

			Err(ReportError::Rejected { status: status.as_u16(), body })
		})
	}
}

/// Reporter that drops every outcome, used when no upstream base URL is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;
impl OutcomeReporter for NoopReporter {
	fn report<'a>(&'a self, session_id: &'a SessionId, _: &'a JsonValue) -> ReportFuture<'a> {
		Box::pin(async move {
			tracing::debug!(session_id = %session_id, "no outcome reporter configured");

			Ok(())
		})
	}
}

/// Hands the authorization code to the upstream `create-oauth-embed-connection` endpoint, which
/// performs the grant and stores the connection.
#[derive(Clone, Debug)]
pub struct PlatformConnector {
	http: ReqwestHttpClient,
	endpoint: Url,
	shared_secret: Option<TokenSecret>,
}
impl PlatformConnector {
	/// Creates a connector posting to `endpoint`.
	pub fn new(http: ReqwestHttpClient, endpoint: Url) -> Self {
		Self { http, endpoint, shared_secret: None }
	}

	/// Secret sent in the [`SECRET_HEADER`] header. A secret carried by the state is used only
	/// when none is configured.
	pub fn with_shared_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.shared_secret = secret;

		self
	}
}
impl CodeExchanger for PlatformConnector {
	fn mode(&self) -> ExchangeMode {
		ExchangeMode::Platform
	}

	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let link_token = request.session.link_token().ok_or_else(|| Error::NotFound {
				entity: LINK_TOKEN,
				key: request.session.session_id.to_string(),
			})?;
			let credential = request.credential;
			let payload = serde_json::json!({
				"linkToken": link_token,
				"formData": { "clientId": credential.client_id },
				"connectionDefinitionId": credential.connection_definition_id,
				"type": request.platform,
				"code": request.code,
				"redirectUri": credential.redirect_uri,
				"clientId": credential.client_id,
			});
			let mut outgoing = self.http.post(self.endpoint.clone()).json(&payload);

			if let Some(secret) = self.shared_secret.as_ref().or(request.secret) {
				outgoing = outgoing.header(SECRET_HEADER, secret.expose());
			}

			let response = outgoing
				.send()
				.await
				.map_err(|e| TransportError::network("platform connector", e))?;
			let status = response.status();
			let body = response
				.bytes()
				.await
				.map_err(|e| TransportError::network("platform connector", e))?;

			if !status.is_success() {
				return Err(ExchangeError {
					kind: classify_upstream_status(status),
					status: Some(status.as_u16()),
					message: format!("platform connector answered HTTP {}", status.as_u16()),
					details: ExchangeError::decode_body(&body),
				}
				.into());
			}
			if body.is_empty() {
				return Ok(JsonValue::Null);
			}

			Ok(ExchangeError::decode_body(&body))
		})
	}
}

fn classify_upstream_status(status: StatusCode) -> ProviderErrorKind {
	match status.as_u16() {
		401 => ProviderErrorKind::InvalidClient,
		403 => ProviderErrorKind::InsufficientScope,
		code if code >= 500 || code == 429 => ProviderErrorKind::Transient,
		_ => ProviderErrorKind::InvalidGrant,
	}
}
