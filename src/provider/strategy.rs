//! Provider strategy hooks that customize token exchanges.
//!
//! Implementations decorate outgoing grant requests and classify rejections without tying the
//! exchange client to any particular HTTP stack.

// self
use crate::{_prelude::*, provider::descriptor::GrantType};

/// Strategy hook that allows providers to decorate requests and classify errors.
pub trait ProviderStrategy: Send + Sync {
	/// Classifies a failed grant request.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters before a grant request is dispatched.
	///
	/// The default implementation adds nothing.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Provider error categories carried by exchange errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
	/// Provider rejected the grant (bad, reused, or expired code or refresh token).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the client may obtain.
	InsufficientScope,
	/// Failure is temporary.
	Transient,
}
impl ProviderErrorKind {
	/// Snake-case label used in logs and metrics.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::InvalidGrant => "invalid_grant",
			Self::InvalidClient => "invalid_client",
			Self::InsufficientScope => "insufficient_scope",
			Self::Transient => "transient",
		}
	}
}

/// Primitive view of a failed grant request handed to [`ProviderStrategy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant that failed.
	pub grant_type: GrantType,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Raw body text for payloads that are not OAuth error documents.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided grant type.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
		}
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: Option<u16>) -> Self {
		self.http_status = status;

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: Option<String>) -> Self {
		self.error_description = description;

		self
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body_preview(mut self, body: &[u8]) -> Self {
		let text = String::from_utf8_lossy(body);

		self.body_preview = Some(text.chars().take(Self::BODY_PREVIEW_LIMIT).collect());

		self
	}
}

/// Default strategy: structured OAuth fields first, then body hints, then the status code.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(code: &str) -> Option<ProviderErrorKind> {
	match code.to_ascii_lowercase().as_str() {
		"invalid_grant" | "access_denied" => Some(ProviderErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(ProviderErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(ProviderErrorKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" => Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	[
		("invalid_grant", ProviderErrorKind::InvalidGrant),
		("invalid_client", ProviderErrorKind::InvalidClient),
		("invalid_scope", ProviderErrorKind::InsufficientScope),
		("insufficient_scope", ProviderErrorKind::InsufficientScope),
		("temporarily_unavailable", ProviderErrorKind::Transient),
	]
	.into_iter()
	.find_map(|(needle, kind)| lowered.contains(needle).then_some(kind))
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(&ctx)
	}

	#[test]
	fn oauth_error_code_wins_over_status() {
		let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
			.with_http_status(Some(401))
			.with_oauth_error("invalid_grant");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidGrant);
	}

	#[test]
	fn body_hints_apply_when_no_code_is_known() {
		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_http_status(Some(500))
			.with_body_preview(b"upstream said: invalid_client");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidClient);
	}

	#[test]
	fn status_fallback_covers_common_codes() {
		let by_status = |status| {
			classify(
				ProviderErrorContext::new(GrantType::AuthorizationCode)
					.with_http_status(Some(status)),
			)
		};

		assert_eq!(by_status(400), ProviderErrorKind::InvalidGrant);
		assert_eq!(by_status(401), ProviderErrorKind::InvalidClient);
		assert_eq!(by_status(403), ProviderErrorKind::InsufficientScope);
		assert_eq!(by_status(429), ProviderErrorKind::Transient);
		assert_eq!(by_status(503), ProviderErrorKind::Transient);
	}

	#[test]
	fn body_preview_is_truncated() {
		let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
			.with_body_preview("x".repeat(1_000).as_bytes());

		assert_eq!(ctx.body_preview.map(|body| body.chars().count()), Some(256));
	}
}
