// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use obo_proxy::{
	error::Error,
	http::ReqwestHttpClient,
	proxy::{AllowList, Dispatch, Dispatcher, ProxyRequest, ProxySettings},
	reqwest::{
		Method,
		header::{self, HeaderValue},
	},
};

mod common;
use common::*;

fn request(method: Method, path: &str) -> ProxyRequest {
	ProxyRequest::new(method, path).with_headers(bearer_headers(SESSION))
}

async fn relayed(result: Result<Dispatch, Error>) -> (u16, String) {
	let response = match result {
		Ok(Dispatch::Relayed(response)) => response,
		other => panic!("Dispatch should relay the downstream response, got {other:?}."),
	};
	let status = response.status().as_u16();
	let body = response.text().await.expect("Downstream body should be readable.");

	(status, body)
}

#[tokio::test]
async fn allowed_request_is_rewritten_and_forwarded_with_delegated_token() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings(&server.base_url()), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/oppgave/123456789")
				.query_param("include", "details")
				.header("authorization", format!("Bearer {DELEGATED}"));
			then.status(200).header("content-type", "application/json").body("{\"id\":123456789}");
		})
		.await;
	let result = dispatcher
		.handle(&route, request(Method::GET, "/api/backend/api/v1/oppgave/123456789?include=details"))
		.await;

	assert_eq!(relayed(result).await, (200, "{\"id\":123456789}".into()));
	assert_eq!(provider.calls(), 1);

	mock.assert_async().await;
}

#[tokio::test]
async fn request_body_and_end_to_end_headers_are_forwarded() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings(&server.base_url()), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let path = format!("/api/v1/sykmelding/{UUID}");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(path.as_str())
				.header("x-request-id", "abc")
				.header("authorization", format!("Bearer {DELEGATED}"))
				.body("{\"diagnose\":\"L87\"}");
			then.status(201);
		})
		.await;
	let mut headers = bearer_headers(SESSION);

	headers.insert("x-request-id", HeaderValue::from_static("abc"));
	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

	let request = ProxyRequest::new(Method::POST, format!("/api/backend{path}"))
		.with_headers(headers)
		.with_body("{\"diagnose\":\"L87\"}");
	let (status, _) = relayed(dispatcher.handle(&route, request).await).await;

	assert_eq!(status, 201);

	mock.assert_async().await;
}

#[tokio::test]
async fn api_path_prefix_is_prepended() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings(&server.url("/internal")), provider);
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/internal/api/v1/pasient");
			then.status(200).body("[]");
		})
		.await;
	let result = dispatcher.handle(&route, request(Method::GET, "/api/backend/api/v1/pasient")).await;

	assert_eq!(relayed(result).await, (200, "[]".into()));

	mock.assert_async().await;
}

#[tokio::test]
async fn downstream_errors_are_relayed_verbatim() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings(&server.base_url()), provider);
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/sykmelder/1234567");
			then.status(500).body("backend exploded");
		})
		.await;
	let result = dispatcher.handle(&route, request(Method::GET, "/api/backend/api/v1/sykmelder/1234567")).await;

	assert_eq!(relayed(result).await, (500, "backend exploded".into()));

	mock.assert_async().await;
}

#[tokio::test]
async fn disallowed_request_never_reaches_provider_or_downstream() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings(&server.base_url()), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.path("/api/v1/oppgave/123456789");
			then.status(200);
		})
		.await;
	let err = dispatcher
		.handle(&route, request(Method::DELETE, "/api/backend/api/v1/oppgave/123456789"))
		.await
		.expect_err("DELETE is not allow-listed.");

	match err {
		Error::NotAllowed { method, path, normalized } => {
			assert_eq!(method, "DELETE");
			assert_eq!(path, "/api/v1/oppgave/123456789");
			assert_eq!(normalized, "DELETE /api/v1/oppgave/[id|hpr]");
		},
		other => panic!("Expected NotAllowed, got {other:?}."),
	}

	assert_eq!(provider.calls(), 0);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn token_failure_abandons_request_before_forwarding() {
	let server = MockServer::start_async().await;
	let provider = FailingTokenProvider::new();
	let dispatcher = dispatcher(settings(&server.base_url()), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.path("/api/v1/pasient");
			then.status(200);
		})
		.await;
	let err = dispatcher
		.handle(&route, request(Method::GET, "/api/backend/api/v1/pasient"))
		.await
		.expect_err("Token acquisition should fail.");

	assert!(matches!(err, Error::TokenAcquisition { ref api, .. } if api.to_string() == API_SCOPE));
	assert_eq!(provider.calls(), 1);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_session_is_rejected_before_the_allow_list() {
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings("http://127.0.0.1:9"), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let err = dispatcher
		.handle(&route, ProxyRequest::new(Method::DELETE, "/api/backend/not/allowed"))
		.await
		.expect_err("Requests without a session should be rejected.");

	assert!(matches!(err, Error::MissingSession));
	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn local_mode_skips_everything() {
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher =
		dispatcher(settings("http://127.0.0.1:9").with_local_mode(true), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let result = dispatcher
		.handle(&route, ProxyRequest::new(Method::GET, "/api/backend/anything"))
		.await
		.expect("Local mode should not fail.");

	assert!(matches!(result, Dispatch::Skipped));
	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn unreachable_downstream_is_a_transport_error() {
	let provider = StaticTokenProvider::new(DELEGATED);
	let dispatcher = dispatcher(settings("http://127.0.0.1:1"), provider.clone());
	let route = dispatcher.settings.routes[0].clone();
	let err = dispatcher
		.handle(&route, request(Method::GET, "/api/backend/api/v1/pasient"))
		.await
		.expect_err("Nothing listens on port 1.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn missing_mount_prefix_falls_back_to_the_unmodified_path() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let allow_list =
		AllowList::parse(["GET /legacy/api/v1/pasient"]).expect("Allow-list should parse.");
	let settings = ProxySettings::new(vec![route(MOUNT_PATH, &server.base_url())], allow_list);
	let dispatcher = dispatcher(settings, provider);
	let route = dispatcher.settings.routes[0].clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/legacy/api/v1/pasient").query_param("fnr", "12345678910");
			then.status(200);
		})
		.await;
	let result =
		dispatcher.handle(&route, request(Method::GET, "/legacy/api/v1/pasient?fnr=12345678910")).await;

	assert_eq!(relayed(result).await.0, 200);

	mock.assert_async().await;
}

#[tokio::test]
async fn downstream_redirect_is_relayed_not_followed() {
	let server = MockServer::start_async().await;
	let provider = StaticTokenProvider::new(DELEGATED);
	let client = ReqwestHttpClient::new().expect("Default client should build.");
	let dispatcher = Dispatcher::new(Arc::new(settings(&server.base_url())), provider, client);
	let route = dispatcher.settings.routes[0].clone();
	let redirect = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/pasient");
			then.status(302).header("location", "/elsewhere");
		})
		.await;
	let target = server
		.mock_async(|when, then| {
			when.path("/elsewhere");
			then.status(200).body("followed");
		})
		.await;
	let response = match dispatcher
		.handle(&route, request(Method::GET, "/api/backend/api/v1/pasient"))
		.await
	{
		Ok(Dispatch::Relayed(response)) => response,
		other => panic!("Dispatch should relay the redirect, got {other:?}."),
	};

	assert_eq!(response.status().as_u16(), 302);
	assert_eq!(
		response.headers().get(header::LOCATION).and_then(|value| value.to_str().ok()),
		Some("/elsewhere")
	);

	redirect.assert_async().await;
	target.assert_calls_async(0).await;
}
