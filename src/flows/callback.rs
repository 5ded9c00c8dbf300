//! Callback state machine.
//!
//! `Start → StateDecoded → SessionLoaded → CredentialResolved → RedirectValidated → Exchanged →
//! Reported → Done`, with `Failed` reachable from every state. Stages run sequentially and any
//! error short-circuits; only the outcome report is allowed to fail without failing the flow.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PlatformType, SessionId, TokenSecret},
	flows::{ExchangeMode, ExchangeRequest, Relay},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CallbackStage, FlowKind, FlowOutcome, FlowSpan},
	resolve::{ResolutionContext, ResolutionError, ResolvedCredential},
	state,
};

/// Inbound callback parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackRequest {
	/// Raw `state` value; a bare session id is accepted too.
	pub state: String,
	/// Authorization code issued by the provider.
	pub code: String,
	/// Caller-supplied client id, used when the session embeds none.
	pub client_id: Option<ClientId>,
	/// Caller-supplied redirect URI; takes precedence over every configured source.
	pub redirect_uri: Option<String>,
	/// Platform used when the state carries none.
	pub platform_type: Option<PlatformType>,
	/// Shared secret used when the state carries none.
	pub secret: Option<TokenSecret>,
}
impl CallbackRequest {
	/// Creates a request with only the mandatory parameters.
	pub fn new(state: impl Into<String>, code: impl Into<String>) -> Self {
		Self {
			state: state.into(),
			code: code.into(),
			client_id: None,
			redirect_uri: None,
			platform_type: None,
			secret: None,
		}
	}

	/// Sets the caller-supplied client id.
	pub fn with_client_id(mut self, client_id: ClientId) -> Self {
		self.client_id = Some(client_id);

		self
	}

	/// Sets the caller-supplied redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
		self.redirect_uri = Some(redirect_uri.into());

		self
	}

	/// Sets the fallback platform.
	pub fn with_platform_type(mut self, platform: PlatformType) -> Self {
		self.platform_type = Some(platform);

		self
	}

	/// Sets the fallback shared secret.
	pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(secret));

		self
	}
}

/// Result of a completed callback.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
	/// Session the callback belonged to.
	pub session_id: SessionId,
	/// Target platform.
	pub platform: PlatformType,
	/// Credential used for the exchange.
	pub credential: ResolvedCredential,
	/// Exchange mode that produced `data`.
	pub mode: ExchangeMode,
	/// Connection outcome returned by the exchanger.
	pub data: JsonValue,
	/// `false` when the outcome report failed and was swallowed.
	pub reported: bool,
}

#[derive(Debug)]
struct Progress {
	stage: CallbackStage,
	session_id: Option<String>,
	platform: Option<String>,
}
impl Progress {
	fn start() -> Self {
		let progress = Self { stage: CallbackStage::Start, session_id: None, platform: None };

		obs::record_transition(CallbackStage::Start, None, None);

		progress
	}

	fn advance(&mut self, stage: CallbackStage) {
		self.stage = stage;

		obs::record_transition(stage, self.session_id.as_deref(), self.platform.as_deref());
	}
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs the full callback flow.
	pub async fn process_callback(&self, request: CallbackRequest) -> Result<CallbackOutcome> {
		const KIND: FlowKind = FlowKind::Callback;

		let span = FlowSpan::new(KIND, "process_callback");
		let mut progress = Progress::start();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.counters.record_attempt();

		let result = span.in_span(self.run_callback(request, &mut progress)).await;

		match &result {
			Ok(_) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.counters.record_success();
			},
			Err(e) => {
				obs::record_failure(progress.stage, progress.session_id.as_deref(), e);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.counters.record_failure();
			},
		}

		result
	}

	async fn run_callback(
		&self,
		request: CallbackRequest,
		progress: &mut Progress,
	) -> Result<CallbackOutcome> {
		if request.code.trim().is_empty() {
			return Err(Error::InvalidRequest { reason: "code is required".into() });
		}

		let mut decoded = state::decode(&request.state)?;

		if decoded.platform_type.is_none() {
			decoded.platform_type = request.platform_type.clone();
		}
		if decoded.secret.is_none() {
			decoded.secret = request.secret.clone();
		}

		progress.session_id = Some(decoded.session_id.to_string());
		progress.platform = decoded.platform_type.as_ref().map(ToString::to_string);
		progress.advance(CallbackStage::StateDecoded);

		let session = self.store.get_session(&decoded.session_id).await?;
		let platform = decoded
			.platform_type
			.clone()
			.or_else(|| self.default_platform.clone())
			.ok_or(ResolutionError::NoPlatformType)?;
		let definition = self.store.get_connection_definition(&platform).await?;

		progress.platform = Some(platform.to_string());
		progress.advance(CallbackStage::SessionLoaded);

		let credential = self.resolver.resolve(&ResolutionContext {
			session: &session,
			definition: &definition,
			platform: &platform,
			caller_client_id: request.client_id.as_ref(),
			caller_redirect_uri: request.redirect_uri.as_deref(),
		})?;

		progress.advance(CallbackStage::CredentialResolved);
		self.validator.validate(&credential.redirect_uri)?;
		progress.advance(CallbackStage::RedirectValidated);

		let data = self
			.exchanger
			.exchange(ExchangeRequest {
				session: &session,
				platform: &platform,
				credential: &credential,
				code: &request.code,
				secret: decoded.secret.as_ref(),
			})
			.await?;

		progress.advance(CallbackStage::Exchanged);

		let reported = match self.reporter.report(&decoded.session_id, &data).await {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(
					target: "oauth2_relay",
					session_id = %decoded.session_id,
					error = %e,
					"outcome report failed; callback continues"
				);
				self.counters.record_report_failure();

				false
			},
		};

		progress.advance(CallbackStage::Reported);
		progress.advance(CallbackStage::Done);

		Ok(CallbackOutcome {
			session_id: decoded.session_id,
			platform,
			credential,
			mode: self.exchanger.mode(),
			data,
			reported,
		})
	}
}
