//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{PlatformType, SessionId},
	store::{
		ConnectionDefinition, EmbedSession, SessionStore, StoreError, StoreFuture, StoreSnapshot,
	},
};

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoreSnapshot>>);
impl MemoryStore {
	/// Seeds the store from an existing snapshot.
	pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
		Self(Arc::new(RwLock::new(snapshot)))
	}

	/// Inserts or replaces the session keyed by its `session_id`.
	pub fn insert_session(&self, session: EmbedSession) {
		let mut guard = self.0.write();

		guard.embed_tokens.retain(|existing| existing.session_id != session.session_id);
		guard.embed_tokens.push(session);
	}

	/// Appends a connection definition; earlier definitions win on lookup.
	pub fn insert_connection_definition(&self, definition: ConnectionDefinition) {
		self.0.write().connection_definitions.push(definition);
	}

	/// Returns a copy of the current contents.
	pub fn snapshot(&self) -> StoreSnapshot {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn get_session<'a>(&'a self, session_id: &'a SessionId) -> StoreFuture<'a, EmbedSession> {
		let snapshot = self.0.clone();

		Box::pin(async move { snapshot.read().find_session(session_id) })
	}

	fn get_connection_definition<'a>(
		&'a self,
		platform: &'a PlatformType,
	) -> StoreFuture<'a, ConnectionDefinition> {
		let snapshot = self.0.clone();

		Box::pin(async move { snapshot.read().find_definition(platform) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::{CONNECTION_DEFINITION, EMBED_SESSION};

	fn session(raw: &str) -> EmbedSession {
		EmbedSession {
			session_id: SessionId::new(raw).expect("Session fixture should be valid."),
			link_settings: Default::default(),
		}
	}

	#[tokio::test]
	async fn inserted_records_are_visible_to_lookups() {
		let store = MemoryStore::default();
		let platform = PlatformType::new("apaleo").expect("Platform should be valid.");

		store.insert_session(session("session_id::a::b"));
		store.insert_session(session("session_id::a::b"));
		store.insert_connection_definition(
			serde_json::from_value(serde_json::json!({
				"_id": "conn_def::apaleo::1",
				"platform": "apaleo"
			}))
			.expect("Definition fixture should deserialize."),
		);

		assert_eq!(store.snapshot().embed_tokens.len(), 1);

		let id = SessionId::new("session_id::a::b").expect("Session id should be valid.");
		let found = store.get_session(&id).await.expect("Session should be found.");

		assert_eq!(found.session_id, id);
		assert!(store.get_connection_definition(&platform).await.is_ok());
	}

	#[tokio::test]
	async fn missing_records_report_not_found() {
		let store = MemoryStore::default();
		let id = SessionId::new("session_id::a::b").expect("Session id should be valid.");
		let platform = PlatformType::new("apaleo").expect("Platform should be valid.");

		assert!(matches!(
			store.get_session(&id).await,
			Err(StoreError::NotFound { entity: EMBED_SESSION, .. })
		));
		assert!(matches!(
			store.get_connection_definition(&platform).await,
			Err(StoreError::NotFound { entity: CONNECTION_DEFINITION, .. })
		));
	}
}
