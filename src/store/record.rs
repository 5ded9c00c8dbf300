//! Persisted records read by the relay: embed sessions and connection definitions.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ConnectionDefinitionId, PlatformType, SessionId, TokenSecret},
};

/// One tenant's connection-linking flow, created before the OAuth flow begins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedSession {
	/// Session key shaped `session_id::<a>::<b>`.
	pub session_id: SessionId,
	/// Link configuration attached to the session.
	#[serde(default)]
	pub link_settings: LinkSettings,
}
impl EmbedSession {
	/// Returns the upstream link token, if the session carries one.
	pub fn link_token(&self) -> Option<&TokenSecret> {
		self.link_settings.event_inc_token.as_ref()
	}
}

/// Link settings stored on an [`EmbedSession`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSettings {
	/// Opaque link token required by the upstream platform.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_inc_token: Option<TokenSecret>,
	/// Platforms the tenant enabled, in priority order.
	#[serde(default)]
	pub connected_platforms: Vec<ConnectedPlatform>,
}

/// Platform entry listed under [`LinkSettings::connected_platforms`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPlatform {
	/// Connection definition the entry points at.
	pub connection_definition_id: ConnectionDefinitionId,
	/// Platform name.
	#[serde(rename = "type")]
	pub platform_type: PlatformType,
	/// Tenant-specific OAuth client settings.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret: Option<PlatformSecret>,
}
impl ConnectedPlatform {
	/// Embedded client id, if present.
	pub fn client_id(&self) -> Option<&ClientId> {
		self.secret.as_ref().and_then(|secret| secret.client_id.as_ref())
	}
}

/// Tenant-specific OAuth client settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSecret {
	/// Client id registered for the tenant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<ClientId>,
}

/// Provider-specific OAuth metadata for one platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDefinition {
	/// Record key.
	#[serde(rename = "_id")]
	pub id: ConnectionDefinitionId,
	/// Platform name (current schema).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<PlatformType>,
	/// Platform name (older schema).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connection_platform: Option<PlatformType>,
	/// Redirect URI registered with the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_redirect_uri: Option<String>,
	/// Frontend hints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frontend: Option<ConnectionFrontend>,
}
impl ConnectionDefinition {
	/// Returns `true` when either platform field names `platform`.
	pub fn serves(&self, platform: &str) -> bool {
		self.platform.as_deref() == Some(platform)
			|| self.connection_platform.as_deref() == Some(platform)
	}

	/// Mobile redirect URI, if configured.
	pub fn ios_redirect_uri(&self) -> Option<&str> {
		self.frontend.as_ref().and_then(|frontend| frontend.ios_redirect_uri.as_deref())
	}
}

/// Frontend section of a [`ConnectionDefinition`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFrontend {
	/// Redirect URI used by the iOS client.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ios_redirect_uri: Option<String>,
}
