// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderEndpoints},
};

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required to build authorize URLs.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for both grants.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Scopes are never guessed.
	#[error("Descriptor must declare its scopes.")]
	MissingScopes,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	userinfo_endpoint: Option<Url>,
	scopes: Option<ScopeSet>,
	client_auth_method: ClientAuthMethod,
	scope_delimiter: char,
}
impl Default for ProviderDescriptorBuilder {
	fn default() -> Self {
		Self {
			authorization_endpoint: None,
			token_endpoint: None,
			userinfo_endpoint: None,
			scopes: None,
			client_auth_method: ClientAuthMethod::default(),
			scope_delimiter: ' ',
		}
	}
}
impl ProviderDescriptorBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the optional userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Sets the requested scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the scope delimiter (defaults to a space).
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let scopes = self.scopes.ok_or(ProviderDescriptorError::MissingScopes)?;

		validate_endpoint("authorization", &authorization)?;
		validate_endpoint("token", &token)?;

		if let Some(userinfo) = self.userinfo_endpoint.as_ref() {
			validate_endpoint("userinfo", userinfo)?;
		}
		if self.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.scope_delimiter,
			});
		}

		Ok(ProviderDescriptor {
			endpoints: ProviderEndpoints { authorization, token, userinfo: self.userinfo_endpoint },
			scopes,
			client_auth_method: self.client_auth_method,
			scope_delimiter: self.scope_delimiter,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	let loopback = url.host_str().is_some_and(|host| LOOPBACK_HOSTS.contains(&host));

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}
