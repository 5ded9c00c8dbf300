// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use oauth2_relay::{
	auth::{ClientId, PlatformType},
	config::RelayConfig,
	error::Error,
	flows::{CallbackRequest, ExchangeMode, ReqwestRelay},
	provider::ProviderErrorKind,
	store::{MemoryStore, StoreSnapshot},
};

const SESSION: &str = "session_id::GDeb6ZDUl_o::hr5KO0lNSuejI-iYrP-0ZA";
const CALLBACK_URI: &str = "https://relay.example.com/auth/callback";
const CONNECT_PATH: &str = "/v1/event-links/create-oauth-embed-connection";
const UPDATE_PATH: &str = "/public/v1/embed-tokens/update";

fn store() -> MemoryStore {
	store_with_definition(json!({
		"_id": "def-apaleo",
		"platform": "apaleo",
		"platformRedirectUri": CALLBACK_URI,
	}))
}

fn store_with_definition(definition: serde_json::Value) -> MemoryStore {
	let snapshot: StoreSnapshot = serde_json::from_value(json!({
		"embedTokens": [{
			"sessionId": SESSION,
			"linkSettings": {
				"eventIncToken": "link-1",
				"connectedPlatforms": [{
					"connectionDefinitionId": "def-apaleo",
					"type": "apaleo",
					"secret": { "clientId": "embedded-client" },
				}],
			},
		}],
		"connectionDefinitions": [definition],
	}))
	.expect("Store snapshot fixture should deserialize.");

	MemoryStore::from_snapshot(snapshot)
}

fn relay(server: &MockServer, extra: &[(&str, String)]) -> ReqwestRelay {
	relay_over(server, extra, store())
}

fn relay_over(server: &MockServer, extra: &[(&str, String)], store: MemoryStore) -> ReqwestRelay {
	let mut vars = vec![
		("CALLBACK_URI", CALLBACK_URI.to_owned()),
		("AUTHORIZATION_URL", server.url("/authorize")),
		("TOKEN_URL", server.url("/token")),
		("SCOPES", "openid offline_access".to_owned()),
		("API_ENDPOINT", server.url(CONNECT_PATH)),
		("BASE_URL", server.url("/")),
		("SHARED_SECRET", "configured-secret".to_owned()),
		("HTTP_TIMEOUT_SECS", "5".to_owned()),
	];

	vars.retain(|(key, _)| extra.iter().all(|(override_key, _)| override_key != key));
	vars.extend(extra.iter().cloned());

	RelayConfig::from_vars(vars)
		.expect("Relay config fixture should load.")
		.build_relay(Arc::new(store))
		.expect("Relay should be assembled.")
}

fn connect_body(client_id: &str) -> serde_json::Value {
	json!({
		"linkToken": "link-1",
		"formData": { "clientId": client_id },
		"connectionDefinitionId": "def-apaleo",
		"type": "apaleo",
		"code": "code-1",
		"redirectUri": CALLBACK_URI,
		"clientId": client_id,
	})
}

#[tokio::test]
async fn platform_mode_exchanges_code_and_reports_outcome() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(CONNECT_PATH)
				.header("X-Pica-Secret", "configured-secret")
				.json_body(connect_body("embedded-client"));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"_id\":\"conn-1\",\"platform\":\"apaleo\"}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(UPDATE_PATH)
				.header("X-Pica-Secret", "configured-secret")
				.json_body(json!({
					"sessionId": SESSION,
					"response": {
						"isConnected": true,
						"connection": { "_id": "conn-1", "platform": "apaleo" },
					},
				}));
			then.status(200);
		})
		.await;
	let relay = relay(&server, &[]);
	let request = CallbackRequest::new(format!("apaleo::{SESSION}#state-secret"), "code-1")
		.with_client_id(ClientId::new("caller-client").expect("Client id fixture should be valid."));
	let outcome = relay.process_callback(request).await.expect("Callback should succeed.");

	connect.assert_async().await;
	update.assert_async().await;

	assert_eq!(outcome.mode, ExchangeMode::Platform);
	assert_eq!(outcome.session_id.as_str(), SESSION);
	assert_eq!(outcome.platform.as_str(), "apaleo");
	assert_eq!(outcome.credential.client_id.as_str(), "embedded-client");
	assert_eq!(outcome.credential.redirect_uri, CALLBACK_URI);
	assert_eq!(outcome.data["_id"], "conn-1");
	assert!(outcome.reported);
	assert_eq!(relay.counters().successes(), 1);
}

#[tokio::test]
async fn failed_report_does_not_fail_the_callback() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH).header("X-Pica-Secret", "configured-secret");
			then.status(200).header("content-type", "application/json").body("{\"_id\":\"conn-2\"}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(500).body("upstream exploded");
		})
		.await;
	let relay = relay(&server, &[]);
	let request = CallbackRequest::new(SESSION, "code-1")
		.with_platform_type(PlatformType::new("apaleo").expect("Platform fixture should be valid."))
		.with_secret("request-secret");
	let outcome = relay
		.process_callback(request)
		.await
		.expect("Report failures should be swallowed.");

	connect.assert_async().await;
	update.assert_async().await;

	assert!(!outcome.reported);
	assert_eq!(outcome.data["_id"], "conn-2");
	assert_eq!(relay.counters().report_failures(), 1);
	assert_eq!(relay.counters().failures(), 0);
}

#[tokio::test]
async fn state_secret_is_used_only_without_a_configured_one() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH).header("X-Pica-Secret", "state-secret");
			then.status(200).header("content-type", "application/json").body("{\"_id\":\"conn-5\"}");
		})
		.await;
	let _update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let relay = relay(&server, &[("SHARED_SECRET", String::new())]);
	let outcome = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}#state-secret"), "code-1"))
		.await
		.expect("Callback should succeed with the state secret.");

	connect.assert_async().await;

	assert_eq!(outcome.data["_id"], "conn-5");
}

#[tokio::test]
async fn redirect_mismatch_stops_before_any_exchange() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(200).body("{}");
		})
		.await;
	let relay = relay(&server, &[]);
	let request = CallbackRequest::new(format!("apaleo::{SESSION}"), "code-1")
		.with_redirect_uri(format!("{CALLBACK_URI}/"));
	let err = relay
		.process_callback(request)
		.await
		.expect_err("Trailing slash should be rejected.");

	assert!(matches!(err, Error::RedirectMismatch { .. }));
	connect.assert_calls_async(0).await;
	assert_eq!(relay.counters().failures(), 1);
}

#[tokio::test]
async fn caller_redirect_serves_definitions_without_one() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH).json_body(connect_body("embedded-client"));
			then.status(200).header("content-type", "application/json").body("{\"_id\":\"conn-4\"}");
		})
		.await;
	let _update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let relay = relay_over(
		&server,
		&[],
		store_with_definition(json!({ "_id": "def-apaleo", "platform": "apaleo" })),
	);
	let request = CallbackRequest::new(format!("apaleo::{SESSION}"), "code-1")
		.with_redirect_uri(CALLBACK_URI);
	let outcome = relay
		.process_callback(request)
		.await
		.expect("Caller redirect should stand in for the definition.");

	connect.assert_async().await;

	assert_eq!(outcome.credential.redirect_uri, CALLBACK_URI);
	assert_eq!(outcome.data["_id"], "conn-4");

	let err = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}"), "code-2"))
		.await
		.expect_err("Without any redirect source the callback should fail.");

	assert!(matches!(err, Error::Resolution(_)));
}

#[tokio::test]
async fn unknown_or_malformed_states_fail_without_upstream_calls() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(200).body("{}");
		})
		.await;
	let relay = relay(&server, &[]);
	let err = relay
		.process_callback(CallbackRequest::new("apaleo::session_id::nope::missing", "code-1"))
		.await
		.expect_err("Unknown sessions should be rejected.");

	assert!(matches!(err, Error::NotFound { entity: "embed session", .. }));

	let err = relay
		.process_callback(CallbackRequest::new("not-a-state", "code-1"))
		.await
		.expect_err("Malformed states should be rejected.");

	assert!(matches!(err, Error::Decode(_)));
	connect.assert_calls_async(0).await;
}

#[tokio::test]
async fn upstream_rejection_surfaces_its_body() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"message\":\"code already used\"}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let relay = relay(&server, &[]);
	let err = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}"), "code-1"))
		.await
		.expect_err("Upstream rejection should fail the callback.");

	connect.assert_async().await;
	update.assert_calls_async(0).await;

	match err {
		Error::Exchange(exchange) => {
			assert_eq!(exchange.status, Some(400));
			assert_eq!(exchange.kind, ProviderErrorKind::InvalidGrant);
			assert_eq!(exchange.details["message"], "code already used");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn direct_mode_runs_grant_and_userinfo_lookup() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-direct\",\"refresh_token\":\"refresh-direct\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer access-direct");
			then.status(200).header("content-type", "application/json").body("{\"sub\":\"user-1\"}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let relay = relay(&server, &[
		("EXCHANGE_MODE", "direct".to_owned()),
		("USERINFO_URL", server.url("/userinfo")),
	]);
	let outcome = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}"), "code-1"))
		.await
		.expect("Direct exchange should succeed.");

	token.assert_async().await;
	userinfo.assert_async().await;
	update.assert_async().await;

	assert_eq!(outcome.mode, ExchangeMode::Direct);
	assert_eq!(outcome.data["accessToken"], "access-direct");
	assert_eq!(outcome.data["refreshToken"], "refresh-direct");
	assert_eq!(outcome.data["userinfo"]["sub"], "user-1");
}

#[tokio::test]
async fn direct_mode_keeps_tokens_issued_without_a_lifetime() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"a\",\"refresh_token\":\"r\",\"token_type\":\"bearer\"}");
		})
		.await;
	let _update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let relay = relay(&server, &[("EXCHANGE_MODE", "direct".to_owned())]);
	let outcome = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}"), "code-1"))
		.await
		.expect("A grant without expires_in should still succeed.");

	token.assert_calls_async(1).await;

	assert_eq!(outcome.data["accessToken"], "a");
	assert_eq!(outcome.data["refreshToken"], "r");
}

#[tokio::test]
async fn direct_mode_rejection_carries_provider_error_body() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(
					"{\"error\":\"invalid_grant\",\"error_description\":\"already used\",\"trace_id\":\"t-1\"}",
				);
		})
		.await;
	let relay = relay(&server, &[("EXCHANGE_MODE", "direct".to_owned())]);
	let err = relay
		.process_callback(CallbackRequest::new(format!("apaleo::{SESSION}"), "stale-code"))
		.await
		.expect_err("Rejected grant should fail the callback.");

	token.assert_calls_async(1).await;

	match err {
		Error::Exchange(exchange) => {
			assert_eq!(exchange.kind, ProviderErrorKind::InvalidGrant);
			assert_eq!(exchange.status, Some(400));
			assert_eq!(exchange.details["error"], "invalid_grant");
			assert_eq!(exchange.details["error_description"], "already used");
			assert_eq!(exchange.details["trace_id"], "t-1");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}
