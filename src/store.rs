//! Session store gateway: read-only lookups of embed sessions and connection definitions.

pub mod file;
pub mod memory;
pub mod record;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::*;

// self
use crate::{
	_prelude::*,
	auth::{PlatformType, SessionId},
};

/// Entity label used when an embed session is missing.
pub const EMBED_SESSION: &str = "embed session";
/// Entity label used when a connection definition is missing.
pub const CONNECTION_DEFINITION: &str = "connection definition";

/// Boxed future returned by [`SessionStore`] lookups.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Lookup contract implemented by session stores.
///
/// Implementations perform pure lookups: no retries beyond what their own client does, and a
/// missing record is reported as [`StoreError::NotFound`] rather than a backend failure.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Fetches the embed session stored under `session_id`.
	fn get_session<'a>(&'a self, session_id: &'a SessionId) -> StoreFuture<'a, EmbedSession>;

	/// Fetches the first connection definition whose `platform` or `connectionPlatform` is
	/// `platform`.
	fn get_connection_definition<'a>(
		&'a self,
		platform: &'a PlatformType,
	) -> StoreFuture<'a, ConnectionDefinition>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// No record exists for the key.
	#[error("{entity} `{key}` was not found.")]
	NotFound {
		/// Kind of record.
		entity: &'static str,
		/// Lookup key.
		key: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Missing embed session.
	pub fn session_not_found(session_id: &SessionId) -> Self {
		Self::NotFound { entity: EMBED_SESSION, key: session_id.to_string() }
	}

	/// Missing connection definition.
	pub fn definition_not_found(platform: &PlatformType) -> Self {
		Self::NotFound { entity: CONNECTION_DEFINITION, key: platform.to_string() }
	}
}

/// Both collections in one serializable value, as loaded by [`FileStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
	/// `embed-tokens` collection.
	#[serde(default)]
	pub embed_tokens: Vec<EmbedSession>,
	/// `connection-definitions` collection.
	#[serde(default)]
	pub connection_definitions: Vec<ConnectionDefinition>,
}
impl StoreSnapshot {
	pub(crate) fn find_session(&self, session_id: &SessionId) -> Result<EmbedSession, StoreError> {
		self.embed_tokens
			.iter()
			.find(|session| &session.session_id == session_id)
			.cloned()
			.ok_or_else(|| StoreError::session_not_found(session_id))
	}

	pub(crate) fn find_definition(
		&self,
		platform: &PlatformType,
	) -> Result<ConnectionDefinition, StoreError> {
		self.connection_definitions
			.iter()
			.find(|definition| definition.serves(platform))
			.cloned()
			.ok_or_else(|| StoreError::definition_not_found(platform))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_lookups_distinguish_missing_records() {
		let snapshot: StoreSnapshot = serde_json::from_value(serde_json::json!({
			"embedTokens": [{ "sessionId": "session_id::a::b" }],
			"connectionDefinitions": [
				{ "_id": "conn_def::apaleo::1", "platform": "apaleo" },
				{ "_id": "conn_def::apaleo::2", "platform": "apaleo" }
			]
		}))
		.expect("Snapshot should deserialize.");
		let session = SessionId::new("session_id::a::b").expect("Session id should be valid.");
		let missing = SessionId::new("session_id::x::y").expect("Session id should be valid.");
		let apaleo = PlatformType::new("apaleo").expect("Platform should be valid.");
		let airtable = PlatformType::new("airtable").expect("Platform should be valid.");

		assert!(snapshot.find_session(&session).is_ok());
		assert_eq!(
			snapshot.find_session(&missing),
			Err(StoreError::NotFound { entity: EMBED_SESSION, key: "session_id::x::y".into() })
		);
		assert_eq!(
			snapshot.find_definition(&apaleo).map(|definition| definition.id.to_string()),
			Ok("conn_def::apaleo::1".into())
		);
		assert!(matches!(
			snapshot.find_definition(&airtable),
			Err(StoreError::NotFound { entity: CONNECTION_DEFINITION, .. })
		));
	}
}
