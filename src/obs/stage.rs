// self
use crate::_prelude::*;

/// Callback orchestrator states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStage {
	/// Request accepted.
	Start,
	/// `state` decoded.
	StateDecoded,
	/// Session and connection definition loaded.
	SessionLoaded,
	/// Client id and redirect URI resolved.
	CredentialResolved,
	/// Redirect URI matched the canonical callback.
	RedirectValidated,
	/// Code exchanged.
	Exchanged,
	/// Outcome reported (or the report failure swallowed).
	Reported,
	/// Flow finished.
	Done,
	/// Terminal failure, reachable from every other state.
	Failed,
}
impl CallbackStage {
	/// Returns a stable label suitable for event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::StateDecoded => "state_decoded",
			Self::SessionLoaded => "session_loaded",
			Self::CredentialResolved => "credential_resolved",
			Self::RedirectValidated => "redirect_validated",
			Self::Exchanged => "exchanged",
			Self::Reported => "reported",
			Self::Done => "done",
			Self::Failed => "failed",
		}
	}
}
impl Display for CallbackStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Emits the event for entering `stage`.
///
/// `Done` is logged at `info`, every other stage at `debug`.
pub fn record_transition(stage: CallbackStage, session_id: Option<&str>, platform: Option<&str>) {
	let session_id = session_id.unwrap_or("-");
	let platform = platform.unwrap_or("-");

	match stage {
		CallbackStage::Done => tracing::info!(
			target: "oauth2_relay",
			session_id,
			platform,
			stage = stage.as_str(),
			"callback completed"
		),
		_ => tracing::debug!(
			target: "oauth2_relay",
			session_id,
			platform,
			stage = stage.as_str(),
			"callback transition"
		),
	}
}

/// Emits the `Failed` event for an error raised while leaving `from`.
pub fn record_failure(from: CallbackStage, session_id: Option<&str>, error: &Error) {
	tracing::warn!(
		target: "oauth2_relay",
		session_id = session_id.unwrap_or("-"),
		stage = CallbackStage::Failed.as_str(),
		from = from.as_str(),
		error = %error,
		"callback failed"
	);
}
