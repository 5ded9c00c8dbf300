//! Ephemeral token set produced by one exchange, plus its builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced by [`OAuthTokenSetBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenSetBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Access/refresh token pair held for the duration of one exchange.
///
/// `expires_at` is expressed in epoch seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthTokenSet {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant in epoch seconds.
	pub expires_at: i64,
	/// Token type reported by the provider (usually `Bearer`).
	pub token_type: String,
}
impl OAuthTokenSet {
	/// Returns a builder for constructing token sets.
	pub fn builder() -> OAuthTokenSetBuilder {
		OAuthTokenSetBuilder::default()
	}

	/// Returns `true` once `now` (epoch seconds) reaches the expiry instant.
	pub fn is_expired_at(&self, now: i64) -> bool {
		now >= self.expires_at
	}

	/// Checks expiry against the current UTC clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc().unix_timestamp())
	}

	/// Keeps `previous` as the refresh token when this set carries none.
	pub fn or_refresh_token(mut self, previous: Option<TokenSecret>) -> Self {
		if self.refresh_token.is_none() {
			self.refresh_token = previous;
		}

		self
	}
}
impl Debug for OAuthTokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthTokenSet")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.finish()
	}
}

/// Builder for [`OAuthTokenSet`].
#[derive(Clone, Debug, Default)]
pub struct OAuthTokenSetBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	received_at: Option<i64>,
	expires_at: Option<i64>,
	expires_in: Option<i64>,
}
impl OAuthTokenSetBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the instant (epoch seconds) the provider response was received.
	pub fn received_at(mut self, epoch_seconds: i64) -> Self {
		self.received_at = Some(epoch_seconds);

		self
	}

	/// Sets an absolute expiry instant in epoch seconds.
	pub fn expires_at(mut self, epoch_seconds: i64) -> Self {
		self.expires_at = Some(epoch_seconds);

		self
	}

	/// Sets a relative lifetime in seconds, counted from `received_at`.
	pub fn expires_in(mut self, seconds: i64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Consumes the builder and produces an [`OAuthTokenSet`].
	pub fn build(self) -> Result<OAuthTokenSet, TokenSetBuilderError> {
		let access_token = self.access_token.ok_or(TokenSetBuilderError::MissingAccessToken)?;
		let received_at =
			self.received_at.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => received_at.saturating_add(delta),
			(None, None) => return Err(TokenSetBuilderError::MissingExpiry),
		};

		Ok(OAuthTokenSet {
			access_token,
			refresh_token: self.refresh_token,
			expires_at,
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
		})
	}
}
