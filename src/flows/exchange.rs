//! Code exchange seam shared by the direct and platform modes.

// self
use crate::{
	_prelude::*,
	auth::{PlatformType, TokenSecret},
	error::TransientError,
	http::TokenHttpClient,
	oauth::{TokenExchangeClient, TransportErrorMapper, UserinfoClient},
	resolve::ResolvedCredential,
	store::EmbedSession,
};

/// Boxed future returned by [`CodeExchanger::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<JsonValue>> + 'a + Send>>;

/// Where the authorization code is redeemed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
	/// The relay runs the grant against the provider token endpoint.
	Direct,
	/// The upstream platform receives the code and runs the grant itself.
	#[default]
	Platform,
}
impl ExchangeMode {
	/// Configuration spelling of the mode.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Direct => "direct",
			Self::Platform => "platform",
		}
	}
}
impl Display for ExchangeMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ExchangeMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"direct" => Ok(Self::Direct),
			"platform" => Ok(Self::Platform),
			other => Err(format!("expected `direct` or `platform`, got `{other}`")),
		}
	}
}

/// Everything an exchanger may need for one callback.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeRequest<'a> {
	/// Session loaded for the callback.
	pub session: &'a EmbedSession,
	/// Target platform.
	pub platform: &'a PlatformType,
	/// Resolved credential, with the validated redirect URI.
	pub credential: &'a ResolvedCredential,
	/// Authorization code from the provider redirect.
	pub code: &'a str,
	/// Shared secret carried by the state or the request.
	pub secret: Option<&'a TokenSecret>,
}

/// Redeems an authorization code and returns the connection outcome that gets reported.
///
/// Implementations must not retry: authorization codes are single use.
pub trait CodeExchanger
where
	Self: Send + Sync,
{
	/// Mode implemented by this exchanger.
	fn mode(&self) -> ExchangeMode;

	/// Redeems `request.code`.
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a>;
}

/// Runs the `authorization_code` grant at the provider and returns the token set, optionally
/// enriched with the userinfo document under `userinfo`.
pub struct DirectExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: TokenExchangeClient<C, M>,
	userinfo: Option<UserinfoClient>,
}
impl<C, M> DirectExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps a token exchange client.
	pub fn new(tokens: TokenExchangeClient<C, M>) -> Self {
		Self { tokens, userinfo: None }
	}

	/// Looks up the userinfo document after each exchange.
	pub fn with_userinfo(mut self, userinfo: Option<UserinfoClient>) -> Self {
		self.userinfo = userinfo;

		self
	}
}
impl<C, M> CodeExchanger for DirectExchanger<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn mode(&self) -> ExchangeMode {
		ExchangeMode::Direct
	}

	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let credential = request.credential;
			let token_set = self
				.tokens
				.exchange_code(request.code, &credential.client_id, &credential.redirect_uri)
				.await?;
			let mut outcome =
				serde_json::to_value(&token_set).map_err(|e| TransientError::Endpoint {
					message: format!("token set could not be serialized: {e}"),
					status: None,
				})?;

			if let Some(userinfo) = &self.userinfo {
				let profile = userinfo.fetch(&token_set.access_token).await?;

				if let JsonValue::Object(map) = &mut outcome {
					map.insert("userinfo".into(), profile);
				}
			}

			Ok(outcome)
		})
	}
}
