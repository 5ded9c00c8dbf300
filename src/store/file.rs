//! Read-only [`SessionStore`] backed by a JSON snapshot on disk.
//!
//! The file holds one object with `embedTokens` and `connectionDefinitions` arrays, mirroring the
//! two upstream collections. Records stay as raw documents until a lookup selects one, so a
//! malformed record only fails the lookups that reach it.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{PlatformType, SessionId},
	store::{ConnectionDefinition, EmbedSession, SessionStore, StoreError, StoreFuture},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
	#[serde(default)]
	embed_tokens: Vec<JsonValue>,
	#[serde(default)]
	connection_definitions: Vec<JsonValue>,
}
impl RawSnapshot {
	fn find_session(&self, session_id: &SessionId) -> Result<EmbedSession, StoreError> {
		let document = self
			.embed_tokens
			.iter()
			.find(|doc| str_field(doc, "sessionId") == Some(session_id.as_str()))
			.ok_or_else(|| StoreError::session_not_found(session_id))?;

		decode_record(document, "embed session", session_id.as_str())
	}

	fn find_definition(&self, platform: &PlatformType) -> Result<ConnectionDefinition, StoreError> {
		let document = self
			.connection_definitions
			.iter()
			.find(|doc| {
				str_field(doc, "platform") == Some(platform.as_str())
					|| str_field(doc, "connectionPlatform") == Some(platform.as_str())
			})
			.ok_or_else(|| StoreError::definition_not_found(platform))?;

		decode_record(document, "connection definition", platform.as_str())
	}
}

/// Loads records from a JSON file and serves lookups from memory.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<RawSnapshot>>,
}
impl FileStore {
	/// Opens the snapshot at `path`. The file must exist; an empty file yields an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Path the store was opened from.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Re-reads the file, replacing the in-memory contents on success.
	pub fn reload(&self) -> Result<(), StoreError> {
		let snapshot = Self::load_snapshot(&self.path)?;

		*self.inner.write() = snapshot;

		tracing::debug!(path = %self.path.display(), "session store reloaded");

		Ok(())
	}

	fn load_snapshot(path: &Path) -> Result<RawSnapshot, StoreError> {
		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(RawSnapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}
}
impl SessionStore for FileStore {
	fn get_session<'a>(&'a self, session_id: &'a SessionId) -> StoreFuture<'a, EmbedSession> {
		Box::pin(async move { self.inner.read().find_session(session_id) })
	}

	fn get_connection_definition<'a>(
		&'a self,
		platform: &'a PlatformType,
	) -> StoreFuture<'a, ConnectionDefinition> {
		Box::pin(async move { self.inner.read().find_definition(platform) })
	}
}

fn str_field<'a>(document: &'a JsonValue, field: &str) -> Option<&'a str> {
	document.get(field).and_then(JsonValue::as_str)
}

fn decode_record<T>(document: &JsonValue, entity: &str, key: &str) -> Result<T, StoreError>
where
	T: DeserializeOwned,
{
	T::deserialize(document).map_err(|e| {
		tracing::warn!(entity, key, error = %e, "stored record is malformed");

		StoreError::Serialization { message: format!("{entity} `{key}` is malformed: {e}") }
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::time::{SystemTime, UNIX_EPOCH};
	// self
	use super::*;

	fn temp_path(name: &str) -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be after the epoch.")
			.as_nanos();

		std::env::temp_dir().join(format!("oauth2-relay-{name}-{nanos}.json"))
	}

	#[tokio::test]
	async fn open_loads_both_collections() {
		let path = temp_path("load");

		fs::write(
			&path,
			r#"{
				"embedTokens": [{ "sessionId": "session_id::a::b" }],
				"connectionDefinitions": [{ "_id": "conn_def::apaleo::1", "platform": "apaleo" }]
			}"#,
		)
		.expect("Fixture file should be written.");

		let store = FileStore::open(&path).expect("Store should open.");
		let id = SessionId::new("session_id::a::b").expect("Session id should be valid.");
		let platform = PlatformType::new("apaleo").expect("Platform should be valid.");

		assert!(store.get_session(&id).await.is_ok());
		assert!(store.get_connection_definition(&platform).await.is_ok());

		fs::write(&path, "").expect("Fixture file should be truncated.");
		store.reload().expect("Empty file should reload.");

		assert!(matches!(store.get_session(&id).await, Err(StoreError::NotFound { .. })));

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn missing_or_corrupt_files_fail_to_open() {
		let path = temp_path("missing");

		assert!(matches!(FileStore::open(&path), Err(StoreError::Backend { .. })));

		fs::write(&path, "{ not json").expect("Fixture file should be written.");

		assert!(matches!(FileStore::open(&path), Err(StoreError::Serialization { .. })));

		let _ = fs::remove_file(&path);
	}

	#[tokio::test]
	async fn malformed_record_only_fails_its_own_lookup() {
		let path = temp_path("malformed");

		fs::write(
			&path,
			r#"{
				"embedTokens": [
					{ "sessionId": "session_id::good::one" },
					{
						"sessionId": "session_id::bad::two",
						"linkSettings": {
							"connectedPlatforms": [{
								"connectionDefinitionId": "conn_def::apaleo::1",
								"type": "apaleo",
								"secret": { "clientId": "" }
							}]
						}
					}
				],
				"connectionDefinitions": [{ "_id": "", "platform": "broken" }]
			}"#,
		)
		.expect("Fixture file should be written.");

		let store = FileStore::open(&path).expect("One bad record should not block the store.");
		let good = SessionId::new("session_id::good::one").expect("Session id should be valid.");
		let bad = SessionId::new("session_id::bad::two").expect("Session id should be valid.");
		let broken = PlatformType::new("broken").expect("Platform should be valid.");

		assert!(store.get_session(&good).await.is_ok());
		assert!(matches!(store.get_session(&bad).await, Err(StoreError::Serialization { .. })));
		assert!(matches!(
			store.get_connection_definition(&broken).await,
			Err(StoreError::Serialization { .. })
		));

		let _ = fs::remove_file(&path);
	}
}
