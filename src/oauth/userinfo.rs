//! Bearer lookup against the provider's userinfo endpoint.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ExchangeError, TransientError, TransportError},
	http::ReqwestHttpClient,
	provider::{DefaultProviderStrategy, GrantType, ProviderErrorContext, ProviderStrategy},
};

/// Fetches the identity behind an access token.
///
/// The request is an idempotent GET, so transport failures and 5xx answers are retried up to
/// `retries` extra times with a linear backoff.
#[derive(Clone, Debug)]
pub struct UserinfoClient {
	http: ReqwestHttpClient,
	endpoint: Url,
	retries: u32,
	backoff: std::time::Duration,
}
impl UserinfoClient {
	const DEFAULT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(200);

	/// Creates a client for `endpoint`.
	pub fn new(http: ReqwestHttpClient, endpoint: Url, retries: u32) -> Self {
		Self { http, endpoint, retries, backoff: Self::DEFAULT_BACKOFF }
	}

	/// Overrides the delay between attempts (multiplied by the attempt number).
	pub fn with_backoff(mut self, backoff: std::time::Duration) -> Self {
		self.backoff = backoff;

		self
	}

	/// Endpoint queried by [`UserinfoClient::fetch`].
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Returns the decoded userinfo document.
	pub async fn fetch(&self, access_token: &TokenSecret) -> Result<JsonValue> {
		let mut attempt = 0;

		loop {
			attempt += 1;

			let retry_left = attempt <= self.retries;
			let sent = self
				.http
				.get(self.endpoint.clone())
				.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
				.header(ACCEPT, "application/json")
				.send()
				.await;
			let response = match sent {
				Ok(response) => response,
				Err(e) if retry_left => {
					tracing::debug!(attempt, error = %e, "userinfo request failed; retrying");
					self.pause(attempt).await;

					continue;
				},
				Err(e) => return Err(TransportError::network("userinfo", e).into()),
			};
			let status = response.status();

			if status.is_server_error() && retry_left {
				tracing::debug!(attempt, status = status.as_u16(), "userinfo answered 5xx; retrying");
				self.pause(attempt).await;

				continue;
			}

			let body = response.bytes().await.map_err(|e| TransportError::network("userinfo", e))?;

			if status.is_success() {
				return serde_json::from_slice(&body).map_err(|e| {
					TransientError::Endpoint {
						message: format!("userinfo endpoint returned malformed JSON: {e}"),
						status: Some(status.as_u16()),
					}
					.into()
				});
			}
			if status.is_server_error() {
				return Err(TransientError::Endpoint {
					message: "userinfo endpoint kept failing".into(),
					status: Some(status.as_u16()),
				}
				.into());
			}

			let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
				.with_http_status(Some(status.as_u16()))
				.with_body_preview(&body);

			return Err(ExchangeError {
				kind: DefaultProviderStrategy.classify_token_error(&ctx),
				status: Some(status.as_u16()),
				message: format!("userinfo endpoint answered HTTP {}", status.as_u16()),
				details: ExchangeError::decode_body(&body),
			}
			.into());
		}
	}

	async fn pause(&self, attempt: u32) {
		tokio::time::sleep(self.backoff.saturating_mul(attempt)).await;
	}
}
