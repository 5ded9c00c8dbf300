//! Refresh gate: refreshes a token set only once it has expired.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, OAuthTokenSet},
	error::ConfigError,
	flows::Relay,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// What [`Relay::refresh_if_expired`] did with the token set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshDecision {
	/// The set had not expired; no provider call was made.
	Reused(OAuthTokenSet),
	/// The set had expired and was replaced by a refresh grant.
	Refreshed(OAuthTokenSet),
}
impl RefreshDecision {
	/// Returns the usable token set.
	pub fn into_token_set(self) -> OAuthTokenSet {
		match self {
			Self::Reused(set) | Self::Refreshed(set) => set,
		}
	}

	/// `true` when a refresh grant was sent.
	pub fn refreshed(&self) -> bool {
		matches!(self, Self::Refreshed(_))
	}
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Refreshes `current` when the clock has reached its expiry, otherwise returns it untouched.
	pub async fn refresh_if_expired(
		&self,
		current: OAuthTokenSet,
		client_id: &ClientId,
	) -> Result<RefreshDecision> {
		self.refresh_if_expired_at(current, client_id, OffsetDateTime::now_utc().unix_timestamp())
			.await
	}

	/// Same as [`Relay::refresh_if_expired`] with an explicit clock (epoch seconds).
	///
	/// Expiry is strict: the grant runs when `now >= expires_at`. A response without a refresh
	/// token keeps the previous one.
	pub async fn refresh_if_expired_at(
		&self,
		current: OAuthTokenSet,
		client_id: &ClientId,
		now: i64,
	) -> Result<RefreshDecision> {
		const KIND: FlowKind = FlowKind::Refresh;

		if !current.is_expired_at(now) {
			tracing::debug!(expires_at = current.expires_at, now, "token set still valid");

			return Ok(RefreshDecision::Reused(current));
		}

		let span = FlowSpan::new(KIND, "refresh_if_expired");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.in_span(async move {
				let refresh_token =
					current.refresh_token.as_ref().ok_or(ConfigError::MissingRefreshToken)?;

				self.counters.record_refresh();

				self.tokens.refresh(refresh_token, client_id).await
			})
			.await;

		match result {
			Ok(set) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				Ok(RefreshDecision::Refreshed(set))
			},
			Err(e) => {
				tracing::warn!(error = %e, "refresh grant failed");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				Err(e)
			},
		}
	}
}
