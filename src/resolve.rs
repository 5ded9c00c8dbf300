//! Credential Resolver: ordered, first-match-wins strategy lists for the client id and the
//! redirect URI governing one exchange.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ConnectionDefinitionId, PlatformType},
	store::{ConnectionDefinition, EmbedSession},
};

/// Failure to derive a [`ResolvedCredential`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ResolutionError {
	/// Neither the session nor the caller nor the configuration supplies a client id.
	#[error("No client id is available for platform `{platform}`.")]
	NoClientId {
		/// Target platform.
		platform: String,
	},
	/// None of the redirect strategies produced a URI.
	#[error("No redirect URI is available for platform `{platform}`.")]
	NoRedirectUri {
		/// Target platform.
		platform: String,
	},
	/// Neither the state, the request, nor the configuration names a platform.
	#[error("No platform type could be determined for the callback.")]
	NoPlatformType,
}

/// Credential set governing one exchange; immutable once derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCredential {
	/// OAuth client id.
	pub client_id: ClientId,
	/// Connection definition backing the platform.
	pub connection_definition_id: ConnectionDefinitionId,
	/// Redirect URI sent with the grant.
	pub redirect_uri: String,
}

/// Inputs visible to resolution strategies.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionContext<'a> {
	/// Embed session loaded for the callback.
	pub session: &'a EmbedSession,
	/// Connection definition for the target platform.
	pub definition: &'a ConnectionDefinition,
	/// Target platform.
	pub platform: &'a PlatformType,
	/// Client id supplied by the caller, if any.
	pub caller_client_id: Option<&'a ClientId>,
	/// Redirect URI supplied by the caller, if any.
	pub caller_redirect_uri: Option<&'a str>,
}

/// One way of finding the client id.
pub trait ClientIdStrategy
where
	Self: Send + Sync,
{
	/// Label used in logs.
	fn name(&self) -> &'static str;

	/// Returns a client id, or `None` to defer to the next strategy.
	fn client_id(&self, ctx: &ResolutionContext<'_>) -> Option<ClientId>;
}

/// One way of finding the redirect URI.
pub trait RedirectUriStrategy
where
	Self: Send + Sync,
{
	/// Label used in logs.
	fn name(&self) -> &'static str;

	/// Returns a redirect URI, or `None` to defer to the next strategy.
	fn redirect_uri(&self, ctx: &ResolutionContext<'_>) -> Option<String>;
}

/// Client id embedded in the first connected-platform entry matching the platform.
///
/// An entry matches when its `type` equals the platform or its `connectionDefinitionId` equals
/// the definition's id. Only the first matching entry is consulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedClientId;
impl ClientIdStrategy for EmbeddedClientId {
	fn name(&self) -> &'static str {
		"embedded"
	}

	fn client_id(&self, ctx: &ResolutionContext<'_>) -> Option<ClientId> {
		ctx.session
			.link_settings
			.connected_platforms
			.iter()
			.find(|entry| {
				&entry.platform_type == ctx.platform
					|| entry.connection_definition_id == ctx.definition.id
			})
			.and_then(|entry| entry.client_id())
			.cloned()
	}
}

/// Client id supplied with the inbound request.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallerClientId;
impl ClientIdStrategy for CallerClientId {
	fn name(&self) -> &'static str {
		"caller"
	}

	fn client_id(&self, ctx: &ResolutionContext<'_>) -> Option<ClientId> {
		ctx.caller_client_id.cloned()
	}
}

/// Client id taken from the relay configuration.
#[derive(Clone, Debug)]
pub struct ConfiguredClientId(pub ClientId);
impl ClientIdStrategy for ConfiguredClientId {
	fn name(&self) -> &'static str {
		"configured"
	}

	fn client_id(&self, _: &ResolutionContext<'_>) -> Option<ClientId> {
		Some(self.0.clone())
	}
}

/// Redirect URI supplied with the inbound request.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallerRedirectUri;
impl RedirectUriStrategy for CallerRedirectUri {
	fn name(&self) -> &'static str {
		"caller"
	}

	fn redirect_uri(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
		ctx.caller_redirect_uri.filter(|uri| !uri.is_empty()).map(str::to_owned)
	}
}

/// Redirect URI forced by the environment.
#[derive(Clone, Debug)]
pub struct RedirectOverride(pub String);
impl RedirectUriStrategy for RedirectOverride {
	fn name(&self) -> &'static str {
		"override"
	}

	fn redirect_uri(&self, _: &ResolutionContext<'_>) -> Option<String> {
		Some(self.0.clone())
	}
}

/// `platformRedirectUri` from the connection definition.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefinitionRedirectUri;
impl RedirectUriStrategy for DefinitionRedirectUri {
	fn name(&self) -> &'static str {
		"definition"
	}

	fn redirect_uri(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
		ctx.definition.platform_redirect_uri.clone().filter(|uri| !uri.is_empty())
	}
}

/// `frontend.iosRedirectUri` from the connection definition.
#[derive(Clone, Copy, Debug, Default)]
pub struct IosRedirectUri;
impl RedirectUriStrategy for IosRedirectUri {
	fn name(&self) -> &'static str {
		"ios"
	}

	fn redirect_uri(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
		ctx.definition.ios_redirect_uri().filter(|uri| !uri.is_empty()).map(str::to_owned)
	}
}

/// Per-platform default table.
#[derive(Clone, Debug, Default)]
pub struct PlatformDefaultRedirect(pub HashMap<PlatformType, String>);
impl RedirectUriStrategy for PlatformDefaultRedirect {
	fn name(&self) -> &'static str {
		"platform_default"
	}

	fn redirect_uri(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
		self.0.get(ctx.platform).cloned()
	}
}

/// Runs the client id and redirect URI strategy lists in order.
#[derive(Clone, Default)]
pub struct CredentialResolver {
	client_ids: Vec<Arc<dyn ClientIdStrategy>>,
	redirects: Vec<Arc<dyn RedirectUriStrategy>>,
}
impl CredentialResolver {
	/// Standard ordering.
	///
	/// Client id: embedded, caller, then `default_client_id` when given.
	/// Redirect URI: caller, `redirect_override`, definition, iOS, then `platform_defaults`.
	pub fn standard(
		default_client_id: Option<ClientId>,
		redirect_override: Option<String>,
		platform_defaults: HashMap<PlatformType, String>,
	) -> Self {
		let mut resolver = Self::default()
			.with_client_id_strategy(EmbeddedClientId)
			.with_client_id_strategy(CallerClientId)
			.with_redirect_strategy(CallerRedirectUri);

		if let Some(client_id) = default_client_id {
			resolver = resolver.with_client_id_strategy(ConfiguredClientId(client_id));
		}
		if let Some(uri) = redirect_override {
			resolver = resolver.with_redirect_strategy(RedirectOverride(uri));
		}

		resolver
			.with_redirect_strategy(DefinitionRedirectUri)
			.with_redirect_strategy(IosRedirectUri)
			.with_redirect_strategy(PlatformDefaultRedirect(platform_defaults))
	}

	/// Appends a client id strategy.
	pub fn with_client_id_strategy(mut self, strategy: impl ClientIdStrategy + 'static) -> Self {
		self.client_ids.push(Arc::new(strategy));

		self
	}

	/// Appends a redirect URI strategy.
	pub fn with_redirect_strategy(mut self, strategy: impl RedirectUriStrategy + 'static) -> Self {
		self.redirects.push(Arc::new(strategy));

		self
	}

	/// Derives the credential for `ctx`.
	pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<ResolvedCredential, ResolutionError> {
		let (client_id, client_source) = self
			.client_ids
			.iter()
			.find_map(|strategy| strategy.client_id(ctx).map(|id| (id, strategy.name())))
			.ok_or_else(|| ResolutionError::NoClientId { platform: ctx.platform.to_string() })?;
		let (redirect_uri, redirect_source) = self
			.redirects
			.iter()
			.find_map(|strategy| strategy.redirect_uri(ctx).map(|uri| (uri, strategy.name())))
			.ok_or_else(|| ResolutionError::NoRedirectUri { platform: ctx.platform.to_string() })?;

		tracing::debug!(
			platform = %ctx.platform,
			client_id = %client_id,
			client_source,
			redirect_source,
			"credential resolved"
		);

		Ok(ResolvedCredential {
			client_id,
			connection_definition_id: ctx.definition.id.clone(),
			redirect_uri,
		})
	}
}
impl Debug for CredentialResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialResolver")
			.field("client_ids", &self.client_ids.iter().map(|s| s.name()).collect::<Vec<_>>())
			.field("redirects", &self.redirects.iter().map(|s| s.name()).collect::<Vec<_>>())
			.finish()
	}
}
