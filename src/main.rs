//! `oauth2-relay` binary.

// std
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
	match oauth2_relay::server::run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %e, "relay exited with an error");
			eprintln!("oauth2-relay: {e}");

			ExitCode::FAILURE
		},
	}
}
