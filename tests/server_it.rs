// std
use std::sync::Arc;
// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
// self
use oauth2_relay::{
	config::RelayConfig,
	server,
	store::{MemoryStore, StoreSnapshot},
};

const SESSION: &str = "session_id::GDeb6ZDUl_o::hr5KO0lNSuejI-iYrP-0ZA";
const CALLBACK_URI: &str = "https://relay.example.com/auth/callback";
const CONNECT_PATH: &str = "/v1/event-links/create-oauth-embed-connection";
const UPDATE_PATH: &str = "/public/v1/embed-tokens/update";

fn app(server: &MockServer) -> Router {
	let snapshot: StoreSnapshot = serde_json::from_value(json!({
		"embedTokens": [
			{
				"sessionId": SESSION,
				"linkSettings": {
					"eventIncToken": "link-1",
					"connectedPlatforms": [{
						"connectionDefinitionId": "def-apaleo",
						"type": "apaleo",
						"secret": { "clientId": "embedded-client" },
					}],
				},
			},
			{
				"sessionId": "session_id::bare::tenant",
				"linkSettings": { "eventIncToken": "link-2", "connectedPlatforms": [] },
			},
		],
		"connectionDefinitions": [{
			"_id": "def-apaleo",
			"platform": "apaleo",
			"platformRedirectUri": CALLBACK_URI,
		}],
	}))
	.expect("Store snapshot fixture should deserialize.");
	let relay = RelayConfig::from_vars([
		("CALLBACK_URI", CALLBACK_URI.to_owned()),
		("AUTHORIZATION_URL", server.url("/authorize")),
		("TOKEN_URL", server.url("/token")),
		("SCOPES", "openid offline_access".to_owned()),
		("API_ENDPOINT", server.url(CONNECT_PATH)),
		("BASE_URL", server.url("/")),
		("DEFAULT_CLIENT_ID", "default-client".to_owned()),
	])
	.expect("Relay config fixture should load.")
	.build_relay(Arc::new(MemoryStore::from_snapshot(snapshot)))
	.expect("Relay should be assembled.");

	server::router(relay)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
	Request::post(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.expect("Request fixture should build.")
}

fn get(uri: &str) -> Request<Body> {
	Request::get(uri).body(Body::empty()).expect("Request fixture should build.")
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.oneshot(request).await.expect("Router should answer.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should be readable.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response body should be JSON.")
	};

	(status, json)
}

#[tokio::test]
async fn health_reports_ok() {
	let server = MockServer::start_async().await;
	let (status, body) = call(app(&server), get("/health")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn process_callback_succeeds_even_when_report_fails() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(200).header("content-type", "application/json").body("{\"_id\":\"conn-1\"}");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(500);
		})
		.await;
	let (status, body) = call(
		app(&server),
		post_json(
			"/process-callback",
			json!({ "sessionId": format!("apaleo::{SESSION}"), "code": "code-1" }),
		),
	)
	.await;

	connect.assert_async().await;
	update.assert_async().await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], true);
	assert_eq!(body["data"]["_id"], "conn-1");
	assert_eq!(body["reported"], false);
}

#[tokio::test]
async fn missing_parameters_are_bad_requests() {
	let server = MockServer::start_async().await;
	let (status, body) =
		call(app(&server), post_json("/process-callback", json!({ "sessionId": SESSION }))).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(body["message"].as_str().is_some_and(|m| m.contains("code is required")));

	let request = Request::post("/process-callback")
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from("{not json"))
		.expect("Request fixture should build.");
	let (status, _) = call(app(&server), request).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failures_map_to_http_statuses() {
	let server = MockServer::start_async().await;
	let cases = [
		(json!({ "sessionId": "garbage", "code": "c" }), StatusCode::BAD_REQUEST),
		(
			json!({ "sessionId": "apaleo::session_id::nope::missing", "code": "c" }),
			StatusCode::NOT_FOUND,
		),
		(
			json!({ "sessionId": "session_id::bare::tenant", "code": "c" }),
			StatusCode::UNPROCESSABLE_ENTITY,
		),
		(
			json!({
				"sessionId": format!("apaleo::{SESSION}"),
				"code": "c",
				"redirectUri": "https://evil.example.com/cb",
			}),
			StatusCode::BAD_REQUEST,
		),
	];

	for (payload, expected) in cases {
		let (status, body) = call(app(&server), post_json("/process-callback", payload)).await;

		assert_eq!(status, expected, "Unexpected status for body {body}.");
		assert!(body["message"].is_string());
	}
}

#[tokio::test]
async fn upstream_rejection_is_a_bad_gateway_with_details() {
	let server = MockServer::start_async().await;
	let _connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"message\":\"code already used\"}");
		})
		.await;
	let (status, body) = call(
		app(&server),
		post_json(
			"/process-callback",
			json!({ "sessionId": format!("apaleo::{SESSION}"), "code": "code-1" }),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(body["details"]["status"], 400);
	assert_eq!(body["details"]["body"]["message"], "code already used");
}

#[tokio::test]
async fn provider_redirect_runs_the_same_flow() {
	let server = MockServer::start_async().await;
	let connect = server
		.mock_async(|when, then| {
			when.method(POST).path(CONNECT_PATH);
			then.status(200).header("content-type", "application/json").body("{\"_id\":\"conn-3\"}");
		})
		.await;
	let _update = server
		.mock_async(|when, then| {
			when.method(POST).path(UPDATE_PATH);
			then.status(200);
		})
		.await;
	let uri = format!("/callback?code=code-1&state=apaleo::{SESSION}");
	let (status, body) = call(app(&server), get(&uri)).await;

	connect.assert_async().await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["_id"], "conn-3");
	assert_eq!(body["reported"], true);

	let (status, body) =
		call(app(&server), get("/callback?error=access_denied&error_description=nope")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["details"]["error"], "access_denied");
}

#[tokio::test]
async fn authorize_redirects_to_the_provider() {
	let server = MockServer::start_async().await;
	let response = app(&server)
		.oneshot(get(&format!("/authorize?sessionId={SESSION}&type=apaleo&secret=s3")))
		.await
		.expect("Router should answer.");

	assert_eq!(response.status(), StatusCode::FOUND);

	let location = response
		.headers()
		.get(header::LOCATION)
		.and_then(|value| value.to_str().ok())
		.expect("Redirect should carry a Location header.");
	let url = Url::parse(location).expect("Location should be a URL.");
	let param = |name: &str| {
		url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
	};

	assert_eq!(url.path(), "/authorize");
	assert_eq!(param("response_type").as_deref(), Some("code"));
	assert_eq!(param("client_id").as_deref(), Some("default-client"));
	assert_eq!(param("redirect_uri").as_deref(), Some(CALLBACK_URI));
	assert_eq!(param("scope").as_deref(), Some("openid offline_access"));
	assert_eq!(param("state"), Some(format!("apaleo::{SESSION}#s3")));
}
