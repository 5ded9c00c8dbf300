//! Relay configuration: an explicit value assembled from `RELAY_*` variables and optional
//! `.env` files, then turned into a [`ReqwestRelay`].

// std
use std::{
	env,
	io::ErrorKind,
	net::SocketAddr,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, PlatformType, ScopeSet, TokenSecret},
	error::ConfigError,
	flows::{CodeExchanger, DirectExchanger, ExchangeMode, ReqwestRelay},
	http::ReqwestHttpClient,
	oauth::{ReqwestTransportErrorMapper, TokenExchangeClient, UserinfoClient},
	provider::{ClientAuthMethod, ProviderDescriptor},
	redirect::RedirectValidator,
	resolve::CredentialResolver,
	store::{FileStore, MemoryStore, SessionStore},
	upstream::{HttpOutcomeReporter, NoopReporter, OutcomeReporter, PlatformConnector},
};

/// Prefix shared by every environment key the relay reads.
pub const ENV_PREFIX: &str = "RELAY_";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_USERINFO_RETRIES: u32 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Log output format of the binary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Text,
	/// One JSON object per event.
	Json,
}
impl FromStr for LogFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"text" | "pretty" => Ok(Self::Text),
			"json" => Ok(Self::Json),
			other => Err(format!("expected `text` or `json`, got `{other}`")),
		}
	}
}

/// Fully validated relay configuration.
///
/// Secrets are held as [`TokenSecret`], so the derived `Debug` output is redacted.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Canonical callback URI registered with the provider.
	pub callback_uri: String,
	/// Provider authorize endpoint.
	pub authorization_url: Url,
	/// Provider token endpoint.
	pub token_url: Url,
	/// Provider userinfo endpoint, used by the direct exchange mode.
	pub userinfo_url: Option<Url>,
	/// Scopes requested in authorize URLs.
	pub scopes: ScopeSet,
	/// How the client authenticates at the token endpoint.
	pub client_auth: ClientAuthMethod,
	/// Client secret sent with direct grants.
	pub client_secret: Option<TokenSecret>,
	/// Client id used when neither the session nor the caller supplies one.
	pub default_client_id: Option<ClientId>,
	/// Redirect URI that wins over every stored value.
	pub redirect_uri_override: Option<String>,
	/// Platform used when neither the state nor the caller names one.
	pub default_platform: Option<PlatformType>,
	/// Last-resort redirect URI per platform.
	pub platform_redirect_defaults: HashMap<PlatformType, String>,
	/// Where authorization codes are redeemed.
	pub exchange_mode: ExchangeMode,
	/// Upstream `create-oauth-embed-connection` endpoint; required in platform mode.
	pub api_endpoint: Option<Url>,
	/// Upstream base URL for outcome reports; reporting is disabled when absent.
	pub base_url: Option<Url>,
	/// Value of the `X-Pica-Secret` header on upstream calls.
	pub shared_secret: Option<TokenSecret>,
	/// JSON snapshot backing the session store; an empty in-memory store is used when absent.
	pub store_path: Option<PathBuf>,
	/// Listen address of the HTTP surface.
	pub bind_addr: SocketAddr,
	/// Fallback filter directive when `RUST_LOG` is unset.
	pub log_level: String,
	/// Log output format.
	pub log_format: LogFormat,
	/// Extra attempts for userinfo lookups.
	pub userinfo_retries: u32,
	/// Timeout applied to every outbound request.
	pub http_timeout: std::time::Duration,
}
impl RelayConfig {
	/// Builds the configuration from `(key, value)` pairs whose keys have the prefix removed.
	///
	/// Empty values are treated as absent.
	pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut vars = Vars(
			vars.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.filter(|(_, v)| !v.trim().is_empty())
				.collect(),
		);
		let callback_uri = vars.required("CALLBACK_URI")?;

		Url::parse(&callback_uri).map_err(|e| ConfigError::invalid_url(&callback_uri, e))?;

		let exchange_mode = vars.parsed("EXCHANGE_MODE")?.unwrap_or_default();
		let api_endpoint = vars.url("API_ENDPOINT")?;

		if exchange_mode == ExchangeMode::Platform && api_endpoint.is_none() {
			return Err(ConfigError::MissingKey { key: "API_ENDPOINT" });
		}

		Ok(Self {
			callback_uri,
			authorization_url: vars.required_url("AUTHORIZATION_URL")?,
			token_url: vars.required_url("TOKEN_URL")?,
			userinfo_url: vars.url("USERINFO_URL")?,
			scopes: ScopeSet::from_str(&vars.required("SCOPES")?)?,
			client_auth: vars.parsed("CLIENT_AUTH")?.unwrap_or_default(),
			client_secret: vars.take("CLIENT_SECRET").map(TokenSecret::new),
			default_client_id: vars.take("DEFAULT_CLIENT_ID").map(ClientId::new).transpose()?,
			redirect_uri_override: vars.take("REDIRECT_URI_OVERRIDE"),
			default_platform: vars.take("DEFAULT_PLATFORM").map(PlatformType::new).transpose()?,
			platform_redirect_defaults: vars
				.take("PLATFORM_REDIRECT_DEFAULTS")
				.map(|raw| parse_platform_defaults(&raw))
				.transpose()?
				.unwrap_or_default(),
			exchange_mode,
			api_endpoint,
			base_url: vars.url("BASE_URL")?,
			shared_secret: vars.take("SHARED_SECRET").map(TokenSecret::new),
			store_path: vars.take("STORE_PATH").map(PathBuf::from),
			bind_addr: vars
				.parsed("BIND_ADDR")?
				.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000))),
			log_level: vars.take("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into()),
			log_format: vars.parsed("LOG_FORMAT")?.unwrap_or_default(),
			userinfo_retries: vars.parsed("USERINFO_RETRIES")?.unwrap_or(DEFAULT_USERINFO_RETRIES),
			http_timeout: std::time::Duration::from_secs(
				vars.parsed("HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
			),
		})
	}

	/// Provider configuration derived from the endpoint and scope settings.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		let mut builder = ProviderDescriptor::builder()
			.authorization_endpoint(self.authorization_url.clone())
			.token_endpoint(self.token_url.clone())
			.scopes(self.scopes.clone())
			.client_auth_method(self.client_auth);

		if let Some(userinfo) = &self.userinfo_url {
			builder = builder.userinfo_endpoint(userinfo.clone());
		}

		Ok(builder.build()?)
	}

	/// Opens the configured session store.
	pub fn open_store(&self) -> Result<Arc<dyn SessionStore>> {
		match &self.store_path {
			Some(path) => Ok(Arc::new(FileStore::open(path)?)),
			None => {
				tracing::warn!("no store path configured; serving an empty in-memory store");

				Ok(Arc::new(MemoryStore::default()))
			},
		}
	}

	/// Assembles a relay over `store` with the reqwest transport stack.
	pub fn build_relay(&self, store: Arc<dyn SessionStore>) -> Result<ReqwestRelay> {
		let http = ReqwestHttpClient::with_timeout(self.http_timeout).map_err(ConfigError::from)?;
		let tokens: TokenExchangeClient =
			TokenExchangeClient::new(self.descriptor()?, http.clone(), ReqwestTransportErrorMapper)
				.with_client_secret(self.client_secret.clone());
		let exchanger: Arc<dyn CodeExchanger> = match (self.exchange_mode, &self.api_endpoint) {
			(ExchangeMode::Platform, Some(endpoint)) => Arc::new(
				PlatformConnector::new(http.clone(), endpoint.clone())
					.with_shared_secret(self.shared_secret.clone()),
			),
			(ExchangeMode::Platform, None) =>
				return Err(ConfigError::MissingKey { key: "API_ENDPOINT" }.into()),
			(ExchangeMode::Direct, _) => {
				let userinfo = self.userinfo_url.as_ref().map(|endpoint| {
					UserinfoClient::new(http.clone(), endpoint.clone(), self.userinfo_retries)
				});

				Arc::new(DirectExchanger::new(tokens.clone()).with_userinfo(userinfo))
			},
		};
		let reporter: Arc<dyn OutcomeReporter> = match &self.base_url {
			Some(base) => Arc::new(
				HttpOutcomeReporter::from_base_url(http.clone(), base)
					.map_err(|e| ConfigError::invalid_url(base.as_str(), e))?
					.with_shared_secret(self.shared_secret.clone()),
			),
			None => Arc::new(NoopReporter),
		};
		let resolver = CredentialResolver::standard(
			self.default_client_id.clone(),
			self.redirect_uri_override.clone(),
			self.platform_redirect_defaults.clone(),
		);

		Ok(ReqwestRelay::new(store, tokens, RedirectValidator::new(self.callback_uri.clone()))
			.with_exchanger(exchanger)
			.with_reporter(reporter)
			.with_resolver(resolver)
			.with_default_platform(self.default_platform.clone())
			.with_default_client_id(self.default_client_id.clone()))
	}
}

/// Loads [`RelayConfig`] from `<base_dir>/.env` and the process environment.
///
/// Only `RELAY_*` keys are considered; process variables override the file.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
	base_dir: PathBuf,
}
impl ConfigLoader {
	/// Creates a loader rooted at the current working directory.
	pub fn new() -> Self {
		Self { base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")) }
	}

	/// Creates a loader rooted at `base_dir`.
	pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
		Self { base_dir: base_dir.into() }
	}

	/// Directory searched for `.env`.
	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}

	/// Loads the configuration from the dotenv file and the process environment.
	pub fn load(&self) -> Result<RelayConfig, ConfigError> {
		self.load_with(env::vars())
	}

	/// Loads the configuration with `process_vars` standing in for the process environment.
	pub fn load_with<I>(&self, process_vars: I) -> Result<RelayConfig, ConfigError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		let mut layered = BTreeMap::new();

		merge_dotenv(&self.base_dir.join(".env"), &mut layered)?;

		for (key, value) in process_vars {
			if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
				layered.insert(stripped.to_owned(), value);
			}
		}

		RelayConfig::from_vars(layered)
	}
}
impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

struct Vars(BTreeMap<String, String>);
impl Vars {
	fn take(&mut self, key: &str) -> Option<String> {
		self.0.remove(key).map(|v| v.trim().to_owned())
	}

	fn required(&mut self, key: &'static str) -> Result<String, ConfigError> {
		self.take(key).ok_or(ConfigError::MissingKey { key })
	}

	fn url(&mut self, key: &'static str) -> Result<Option<Url>, ConfigError> {
		self.take(key)
			.map(|raw| Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e)))
			.transpose()
	}

	fn required_url(&mut self, key: &'static str) -> Result<Url, ConfigError> {
		self.url(key)?.ok_or(ConfigError::MissingKey { key })
	}

	fn parsed<T>(&mut self, key: &'static str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		self.take(key)
			.map(|raw| {
				raw.parse::<T>()
					.map_err(|e| ConfigError::InvalidValue { key, reason: format!("`{raw}`: {e}") })
			})
			.transpose()
	}
}

fn parse_platform_defaults(raw: &str) -> Result<HashMap<PlatformType, String>, ConfigError> {
	raw.split(',')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(|entry| {
			let (platform, uri) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
				key: "PLATFORM_REDIRECT_DEFAULTS",
				reason: format!("entry `{entry}` is not `platform=uri`"),
			})?;
			let uri = uri.trim();

			Url::parse(uri).map_err(|e| ConfigError::invalid_url(uri, e))?;

			Ok((PlatformType::new(platform.trim())?, uri.to_owned()))
		})
		.collect()
}

fn merge_dotenv(path: &Path, values: &mut BTreeMap<String, String>) -> Result<(), ConfigError> {
	match dotenvy::from_path_iter(path) {
		Ok(iter) => {
			for item in iter {
				let (key, value) = item
					.map_err(|source| ConfigError::EnvFile { path: path.to_path_buf(), source })?;

				if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
					values.insert(stripped.to_owned(), value);
				}
			}

			tracing::debug!(path = %path.display(), "environment file merged");

			Ok(())
		},
		Err(dotenvy::Error::Io(ref e)) if e.kind() == ErrorKind::NotFound => Ok(()),
		Err(source) => Err(ConfigError::EnvFile { path: path.to_path_buf(), source }),
	}
}
