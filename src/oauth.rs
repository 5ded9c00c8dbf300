//! Token Exchange Client: `authorization_code` and `refresh_token` grants over `oauth2`.
//!
//! Each call builds a fresh `oauth2` client for the resolved client id, so invocations share no
//! mutable state. Grant requests are POSTs and are never retried here.

pub mod userinfo;

pub use oauth2;
pub use userinfo::UserinfoClient;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId as OAuthClientId, ClientSecret, CsrfToken,
	EndpointNotSet, EndpointSet, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, OAuthTokenSet, TokenSecret},
	error::{ConfigError, ExchangeError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor,
		ProviderErrorContext, ProviderStrategy,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps HTTP transport failures into relay [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a relay error.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		let status = meta_status(meta);

		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(grant, status, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransientError::Endpoint {
				message: format!("HTTP client failed during the {grant} grant: {message}"),
				status,
			}
			.into(),
			_ => TransientError::Endpoint {
				message: format!("HTTP client failed during the {grant} grant"),
				status,
			}
			.into(),
		}
	}
}

/// Performs grant requests against the configured token endpoint.
pub struct TokenExchangeClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: Arc<ProviderDescriptor>,
	client_secret: Option<TokenSecret>,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client using [`DefaultProviderStrategy`] for error classification.
	pub fn new(
		descriptor: impl Into<Arc<ProviderDescriptor>>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			descriptor: descriptor.into(),
			client_secret: None,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			strategy: Arc::new(DefaultProviderStrategy),
		}
	}

	/// Sets the client secret sent with every grant.
	pub fn with_client_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.client_secret = secret;

		self
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Provider configuration in use.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Builds the provider authorize URL carrying `state` verbatim.
	pub fn authorization_url(
		&self,
		client_id: &ClientId,
		redirect_uri: &str,
		state: &str,
	) -> Result<Url> {
		let redirect = RedirectUrl::new(redirect_uri.to_owned())
			.map_err(|source| ConfigError::invalid_url(redirect_uri, source))?;
		let client = self.oauth_client(client_id).set_redirect_uri(redirect);
		let state = state.to_owned();
		let mut request = client.authorize_url(move || CsrfToken::new(state));

		if self.descriptor.scope_delimiter == ' ' {
			request = request.add_scopes(self.descriptor.scopes.iter().cloned().map(Scope::new));
		} else {
			request = request.add_extra_param("scope", self.descriptor.scope_param());
		}

		let (url, _) = request.url();

		Ok(url)
	}

	/// Exchanges an authorization code for a token set.
	///
	/// Any non-2xx answer becomes [`ExchangeError`] carrying the decoded body.
	pub async fn exchange_code(
		&self,
		code: &str,
		client_id: &ClientId,
		redirect_uri: &str,
	) -> Result<OAuthTokenSet> {
		const GRANT: GrantType = GrantType::AuthorizationCode;

		let redirect = RedirectUrl::new(redirect_uri.to_owned())
			.map_err(|source| ConfigError::invalid_url(redirect_uri, source))?;
		let client = self.oauth_client(client_id);
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect));

		for (key, value) in self.extra_params(GRANT) {
			request = request.add_extra_param(key, value);
		}

		tracing::debug!(grant = %GRANT, client_id = %client_id, "dispatching grant request");

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(GRANT, meta.take(), err))?;

		token_set_from(&response, OffsetDateTime::now_utc().unix_timestamp())
	}

	/// Runs the refresh grant.
	///
	/// When the response omits `refresh_token`, the returned set keeps `refresh_token`.
	pub async fn refresh(
		&self,
		refresh_token: &TokenSecret,
		client_id: &ClientId,
	) -> Result<OAuthTokenSet> {
		const GRANT: GrantType = GrantType::RefreshToken;

		let client = self.oauth_client(client_id);
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let secret = RefreshToken::new(refresh_token.expose().to_owned());
		let mut request = client.exchange_refresh_token(&secret);

		for (key, value) in self.extra_params(GRANT) {
			request = request.add_extra_param(key, value);
		}

		tracing::debug!(grant = %GRANT, client_id = %client_id, "dispatching grant request");

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(GRANT, meta.take(), err))?;
		let set = token_set_from(&response, OffsetDateTime::now_utc().unix_timestamp())?;

		Ok(set.or_refresh_token(Some(refresh_token.clone())))
	}

	fn oauth_client(&self, client_id: &ClientId) -> ConfiguredBasicClient {
		let mut client = BasicClient::new(OAuthClientId::new(client_id.to_string()))
			.set_auth_uri(AuthUrl::from_url(self.descriptor.endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(self.descriptor.endpoints.token.clone()));

		if let Some(secret) = &self.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if matches!(self.descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			client = client.set_auth_type(AuthType::RequestBody);
		}

		client
	}

	fn extra_params(&self, grant: GrantType) -> BTreeMap<String, String> {
		let mut form = BTreeMap::new();

		self.strategy.augment_token_request(grant, &mut form);

		form
	}

	fn map_request_error(
		&self,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let status = meta_status(meta.as_ref());
		let error_body = meta.as_ref().and_then(|value| value.error_body.as_deref());
		let answered_ok = status.is_none_or(|code| (200..300).contains(&code));

		match err {
			RequestTokenError::ServerResponse(response) =>
				self.rejected_with_oauth_error(grant, status, response, error_body).into(),
			RequestTokenError::Request(error) =>
				self.error_mapper.map_transport_error(grant, meta.as_ref(), error),
			RequestTokenError::Parse(source, _) if answered_ok =>
				TransientError::TokenResponseParse { source, status }.into(),
			RequestTokenError::Parse(_, body) => self.rejected_with_body(grant, status, &body).into(),
			RequestTokenError::Other(message) if answered_ok =>
				TransientError::Endpoint { message, status }.into(),
			RequestTokenError::Other(message) => {
				let ctx = ProviderErrorContext::new(grant).with_http_status(status);

				ExchangeError {
					kind: self.strategy.classify_token_error(&ctx),
					status,
					message,
					details: JsonValue::Null,
				}
				.into()
			},
		}
	}

	fn rejected_with_oauth_error(
		&self,
		grant: GrantType,
		status: Option<u16>,
		response: BasicErrorResponse,
		raw_body: Option<&[u8]>,
	) -> ExchangeError {
		let code = response.error().as_ref().to_owned();
		let description = response.error_description().cloned();
		let ctx = ProviderErrorContext::new(grant)
			.with_http_status(status)
			.with_oauth_error(code.clone())
			.with_error_description(description.clone());
		let message = match description {
			Some(description) => format!("token endpoint returned `{code}`: {description}"),
			None => format!("token endpoint returned `{code}`"),
		};

		ExchangeError {
			kind: self.strategy.classify_token_error(&ctx),
			status,
			message,
			details: match raw_body {
				Some(body) => ExchangeError::decode_body(body),
				None => serde_json::to_value(&response).unwrap_or(JsonValue::Null),
			},
		}
	}

	fn rejected_with_body(&self, grant: GrantType, status: Option<u16>, body: &[u8]) -> ExchangeError {
		let ctx = ProviderErrorContext::new(grant).with_http_status(status).with_body_preview(body);
		let message = match status {
			Some(code) => format!("token endpoint answered HTTP {code}"),
			None => "token endpoint rejected the request".into(),
		};

		ExchangeError {
			kind: self.strategy.classify_token_error(&ctx),
			status,
			message,
			details: ExchangeError::decode_body(body),
		}
	}
}
impl<C, M> Clone for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			descriptor: self.descriptor.clone(),
			client_secret: self.client_secret.clone(),
			http_client: self.http_client.clone(),
			error_mapper: self.error_mapper.clone(),
			strategy: self.strategy.clone(),
		}
	}
}

fn token_set_from(response: &BasicTokenResponse, received_at: i64) -> Result<OAuthTokenSet> {
	// A set without a lifetime is expired on receipt.
	let expires_in = match response.expires_in() {
		Some(lifetime) => i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX),
		None => {
			tracing::debug!("token response carries no expires_in; treating it as already expired");

			0
		},
	};
	let mut builder = OAuthTokenSet::builder()
		.access_token(response.access_token().secret().to_owned())
		.token_type(response.token_type().as_ref())
		.received_at(received_at)
		.expires_in(expires_in);

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|e| ConfigError::from(e).into())
}

fn map_reqwest_error(grant: GrantType, status: Option<u16>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			message: format!("request timed out during the {grant} grant"),
			status: status.or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::network("token", err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
