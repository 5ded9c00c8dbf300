//! Callback Orchestrator and the helper flows built on the same relay.

pub mod authorize;
pub mod callback;
pub mod exchange;
pub mod refresh;

pub use callback::*;
pub use exchange::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PlatformType},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TokenExchangeClient, TransportErrorMapper},
	obs::FlowCounters,
	redirect::RedirectValidator,
	resolve::CredentialResolver,
	store::SessionStore,
	upstream::{NoopReporter, OutcomeReporter},
};

/// Relay specialized for the crate's default reqwest transport stack.
pub type ReqwestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Composes the state codec, session store, credential resolver, redirect validator, code
/// exchanger, and outcome reporter into the callback flow.
///
/// Configuration is injected at construction; clones share the same collaborators and
/// counters, and concurrent callbacks share nothing mutable.
pub struct Relay<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	store: Arc<dyn SessionStore>,
	tokens: TokenExchangeClient<C, M>,
	exchanger: Arc<dyn CodeExchanger>,
	reporter: Arc<dyn OutcomeReporter>,
	resolver: CredentialResolver,
	validator: RedirectValidator,
	default_platform: Option<PlatformType>,
	default_client_id: Option<ClientId>,
	counters: Arc<FlowCounters>,
}
impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a relay that exchanges codes directly at the provider and reports nowhere.
	pub fn new(
		store: Arc<dyn SessionStore>,
		tokens: TokenExchangeClient<C, M>,
		validator: RedirectValidator,
	) -> Self {
		let exchanger = Arc::new(DirectExchanger::new(tokens.clone()));

		Self {
			store,
			tokens,
			exchanger,
			reporter: Arc::new(NoopReporter),
			resolver: CredentialResolver::standard(None, None, HashMap::new()),
			validator,
			default_platform: None,
			default_client_id: None,
			counters: Default::default(),
		}
	}

	/// Replaces the code exchanger.
	pub fn with_exchanger(mut self, exchanger: Arc<dyn CodeExchanger>) -> Self {
		self.exchanger = exchanger;

		self
	}

	/// Replaces the outcome reporter.
	pub fn with_reporter(mut self, reporter: Arc<dyn OutcomeReporter>) -> Self {
		self.reporter = reporter;

		self
	}

	/// Replaces the credential resolver.
	pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
		self.resolver = resolver;

		self
	}

	/// Platform used when neither the state nor the request names one.
	pub fn with_default_platform(mut self, platform: Option<PlatformType>) -> Self {
		self.default_platform = platform;

		self
	}

	/// Client id used for authorize URLs when the caller supplies none.
	pub fn with_default_client_id(mut self, client_id: Option<ClientId>) -> Self {
		self.default_client_id = client_id;

		self
	}

	/// Token exchange client used for refreshes and authorize URLs.
	pub fn tokens(&self) -> &TokenExchangeClient<C, M> {
		&self.tokens
	}

	/// Canonical callback URI.
	pub fn callback_uri(&self) -> &str {
		self.validator.canonical()
	}

	/// Active exchange mode.
	pub fn exchange_mode(&self) -> ExchangeMode {
		self.exchanger.mode()
	}

	/// Counters shared by every clone of this relay.
	pub fn counters(&self) -> &FlowCounters {
		&self.counters
	}
}
impl<C, M> Clone for Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			tokens: self.tokens.clone(),
			exchanger: self.exchanger.clone(),
			reporter: self.reporter.clone(),
			resolver: self.resolver.clone(),
			validator: self.validator.clone(),
			default_platform: self.default_platform.clone(),
			default_client_id: self.default_client_id.clone(),
			counters: self.counters.clone(),
		}
	}
}
impl<C, M> Debug for Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("descriptor", self.tokens.descriptor())
			.field("callback_uri", &self.validator.canonical())
			.field("exchange_mode", &self.exchanger.mode())
			.field("resolver", &self.resolver)
			.field("default_platform", &self.default_platform)
			.finish()
	}
}
