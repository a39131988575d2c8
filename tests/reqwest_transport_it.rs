#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use okta_admin_core::{
	ApiClient, AuthorizationMode, CancellationToken, ClientConfig, config::CacheConfig,
	http_types::Method,
};

fn jwt_config(server: &MockServer) -> ClientConfig {
	ClientConfig::new(server.base_url(), AuthorizationMode::Jwt)
		.with_client_assertion("header.claims.signature")
		.with_scopes(["okta.users.read", "okta.groups.read"])
		.with_https_check_disabled()
}

#[tokio::test]
async fn assertion_credential_is_reused_across_requests() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=client_credentials")
				.body_includes("scope=okta.groups.read+okta.users.read")
				.body_includes("client_assertion=header.claims.signature");
			then.status(200).header("content-type", "application/json").body(
				r#"{"token_type":"Bearer","expires_in":3600,"access_token":"issued-token","scope":"okta.groups.read okta.users.read"}"#,
			);
		})
		.await;
	let users = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/users")
				.header("authorization", "Bearer issued-token")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(r#"[{"id":"00u1"}]"#);
		})
		.await;
	let client = ApiClient::new(jwt_config(&server)).expect("Client should build.");
	let cancel = CancellationToken::new();

	for _ in 0..2 {
		let request = client.request(Method::GET, "/api/v1/users").expect("Endpoint should resolve.");
		let response = client
			.execute(request, &cancel)
			.await
			.expect("Request should succeed.")
			.error_for_status()
			.expect("Users listing should be 2xx.");

		assert_eq!(response.text(), r#"[{"id":"00u1"}]"#);
	}

	token.assert_hits_async(1).await;
	users.assert_hits_async(2).await;
}

#[tokio::test]
async fn cached_responses_are_served_without_a_round_trip() {
	let server = MockServer::start_async().await;
	let groups = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/groups").header("authorization", "SSWS 00a-token");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let client = ApiClient::new(
		ClientConfig::new(server.base_url(), AuthorizationMode::Ssws)
			.with_token("00a-token")
			.with_cache(CacheConfig { enabled: true, ..Default::default() })
			.with_https_check_disabled(),
	)
	.expect("Client should build.");
	let cancel = CancellationToken::new();

	for _ in 0..3 {
		let request = client.request(Method::GET, "/api/v1/groups").expect("Endpoint should resolve.");

		client.execute(request, &cancel).await.expect("Request should succeed.");
	}

	groups.assert_hits_async(1).await;
}

#[tokio::test]
async fn api_errors_are_returned_for_inspection() {
	let server = MockServer::start_async().await;
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users/00u-missing");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"errorCode":"E0000007","errorSummary":"Not found: Resource not found: 00u-missing (User)"}"#);
		})
		.await;
	let client = ApiClient::new(
		ClientConfig::new(server.base_url(), AuthorizationMode::Bearer)
			.with_token("access-token")
			.with_https_check_disabled(),
	)
	.expect("Client should build.");
	let request = client.request(Method::GET, "/api/v1/users/00u-missing").expect("Endpoint should resolve.");
	let response =
		client.execute(request, &CancellationToken::new()).await.expect("404 is a response, not an error.");
	let err = response.error_for_status().expect_err("404 should convert into an error.");

	assert!(matches!(err, okta_admin_core::Error::Api { status: 404, ref body } if body.contains("E0000007")));

	missing.assert_async().await;
}
