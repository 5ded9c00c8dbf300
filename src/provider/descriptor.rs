//! Validated provider configuration consumed by the token exchange client.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant identifiers used for request classification.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}
impl ClientAuthMethod {
	/// Configuration spelling of the method.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ClientSecretPost => "client_secret_post",
			Self::ClientSecretBasic => "client_secret_basic",
		}
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ClientAuthMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"client_secret_post" => Ok(Self::ClientSecretPost),
			"client_secret_basic" => Ok(Self::ClientSecretBasic),
			other => Err(format!(
				"expected `client_secret_post` or `client_secret_basic`, got `{other}`"
			)),
		}
	}
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the browser is sent to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Optional userinfo endpoint queried with the access token.
	pub userinfo: Option<Url>,
}

/// Immutable provider configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested on the authorize URL.
	pub scopes: ScopeSet,
	/// Client authentication mechanism used at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Character used to join scopes in the `scope` parameter.
	pub scope_delimiter: char,
}
impl ProviderDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Scopes joined with the configured delimiter.
	pub fn scope_param(&self) -> String {
		self.scopes.joined(self.scope_delimiter)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse.")
	}

	fn scopes() -> ScopeSet {
		ScopeSet::new(["offline_access", "account.read"]).expect("Scope fixture should be valid.")
	}

	#[test]
	fn builder_requires_https_except_on_loopback() {
		let insecure = ProviderDescriptor::builder()
			.authorization_endpoint(url("http://identity.example.com/connect/authorize"))
			.token_endpoint(url("https://identity.example.com/connect/token"))
			.scopes(scopes())
			.build();

		assert!(matches!(
			insecure,
			Err(ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. })
		));

		let loopback = ProviderDescriptor::builder()
			.authorization_endpoint(url("http://127.0.0.1:8080/authorize"))
			.token_endpoint(url("http://localhost:8080/token"))
			.userinfo_endpoint(url("http://[::1]:8080/userinfo"))
			.scopes(scopes())
			.build();

		assert!(loopback.is_ok());
	}

	#[test]
	fn builder_rejects_missing_parts() {
		assert_eq!(
			ProviderDescriptor::builder().scopes(scopes()).build(),
			Err(ProviderDescriptorError::MissingAuthorizationEndpoint)
		);
		assert_eq!(
			ProviderDescriptor::builder()
				.authorization_endpoint(url("https://identity.example.com/authorize"))
				.token_endpoint(url("https://identity.example.com/token"))
				.build(),
			Err(ProviderDescriptorError::MissingScopes)
		);
	}

	#[test]
	fn scope_param_uses_delimiter() {
		let descriptor = ProviderDescriptor::builder()
			.authorization_endpoint(url("https://identity.example.com/authorize"))
			.token_endpoint(url("https://identity.example.com/token"))
			.scopes(scopes())
			.scope_delimiter(',')
			.build()
			.expect("Descriptor should build.");

		assert_eq!(descriptor.scope_param(), "offline_access,account.read");
		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);
	}

	#[test]
	fn client_auth_method_parses_config_spelling() {
		assert_eq!("client_secret_basic".parse(), Ok(ClientAuthMethod::ClientSecretBasic));
		assert!("private_key_jwt".parse::<ClientAuthMethod>().is_err());
	}
}
