//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// self
use obo_proxy::{
	auth::{AccessToken, ApiId, DelegatedToken, SessionToken},
	error::TokenError,
	http::ReqwestHttpClient,
	provider::{TokenFuture, TokenProvider},
	proxy::{AllowList, ApiTarget, Dispatcher, ProxyRoute, ProxySettings},
	reqwest::{
		Client,
		header::{self, HeaderMap, HeaderValue},
		redirect::Policy,
	},
	url::Url,
};

pub const API_SCOPE: &str = "api://backend/.default";
pub const MOUNT_PATH: &str = "/api/backend";
pub const SESSION: &str = "session-token";
pub const DELEGATED: &str = "delegated-token";
pub const UUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.redirect(Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn api_id() -> ApiId {
	ApiId::new(API_SCOPE).expect("Test API identifier should be valid.")
}

pub fn route(mount_path: &str, base_url: &str) -> ProxyRoute {
	let target = ApiTarget::new(
		api_id(),
		Url::parse(base_url).expect("Downstream base URL should parse."),
	)
	.expect("Downstream target should build.");

	ProxyRoute::new(mount_path, target).expect("Route should build.")
}

pub fn settings(base_url: &str) -> ProxySettings {
	ProxySettings::new(
		vec![route(MOUNT_PATH, base_url)],
		AllowList::default_list().expect("Built-in allow-list should parse."),
	)
}

pub fn dispatcher(settings: ProxySettings, provider: Arc<dyn TokenProvider>) -> Dispatcher {
	Dispatcher::new(Arc::new(settings), provider, test_reqwest_http_client())
}

pub fn bearer_headers(token: &str) -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(
		header::AUTHORIZATION,
		HeaderValue::from_str(&format!("Bearer {token}")).expect("Bearer header should be valid."),
	);

	headers
}

/// Issues the same delegated token for every exchange and counts calls.
#[derive(Debug)]
pub struct StaticTokenProvider {
	token: String,
	calls: AtomicUsize,
}
impl StaticTokenProvider {
	pub fn new(token: &str) -> Arc<Self> {
		Arc::new(Self { token: token.into(), calls: AtomicUsize::new(0) })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenProvider for StaticTokenProvider {
	fn on_behalf_of<'a>(
		&'a self,
		session: &'a SessionToken,
		target: &'a ApiTarget,
	) -> TokenFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			assert_eq!(session.expose(), SESSION, "Dispatcher should pass the caller's session.");

			DelegatedToken::new(
				target.id.clone(),
				AccessToken::new(self.token.clone()),
				time::OffsetDateTime::now_utc(),
				time::Duration::minutes(5),
			)
		})
	}
}

/// Rejects every exchange and counts calls.
#[derive(Debug, Default)]
pub struct FailingTokenProvider {
	calls: AtomicUsize,
}
impl FailingTokenProvider {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenProvider for FailingTokenProvider {
	fn on_behalf_of<'a>(&'a self, _: &'a SessionToken, _: &'a ApiTarget) -> TokenFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(TokenError::InvalidGrant { reason: "AADSTS500133".into() }) })
	}
}
