//! Authorize URL construction for the sign-in redirect.

// self
use crate::{
	_prelude::*,
	auth::ClientId,
	flows::Relay,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome},
	resolve::ResolutionError,
	state::CallbackState,
};

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the provider authorize URL for `state`.
	///
	/// The URL carries `response_type=code`, the client id (`client_id`, else the configured
	/// default), the canonical callback URI, the configured scopes, and the encoded state.
	pub fn authorization_url(
		&self,
		state: &CallbackState,
		client_id: Option<&ClientId>,
	) -> Result<Url> {
		const KIND: FlowKind = FlowKind::Authorize;

		let client_id = client_id.or(self.default_client_id.as_ref()).ok_or_else(|| {
			ResolutionError::NoClientId {
				platform: state.platform_type.as_ref().map(ToString::to_string).unwrap_or_default(),
			}
		})?;
		let result =
			self.tokens.authorization_url(client_id, self.validator.canonical(), &state.encode());
		let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

		obs::record_flow_outcome(KIND, outcome);

		result
	}
}
