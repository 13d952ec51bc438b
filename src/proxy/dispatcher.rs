//! Proxy dispatcher: local-mode short-circuit, authentication gate, allow-list check, token
//! acquisition, forwarding, and relay, in that order and without retries.

// self
use crate::{
	_prelude::*,
	auth::SessionToken,
	error::TransportError,
	http::{self, ReqwestHttpClient},
	obs::{self, ProxyStage, RequestSpan},
	provider::TokenProvider,
	proxy::{ProxyRoute, ProxySettings, Rewrite, rewrite},
};

/// Inbound request as seen by the dispatcher.
#[derive(Clone, Debug)]
pub struct ProxyRequest {
	/// Inbound method, forwarded unchanged.
	pub method: Method,
	/// Path and query exactly as received, mount prefix included.
	pub path: String,
	/// Inbound headers; hop-by-hop headers and `authorization` are not forwarded.
	pub headers: HeaderMap,
	/// Buffered inbound body, forwarded unchanged.
	pub body: Bytes,
	/// Caller's session credential, when one was presented.
	pub session: Option<SessionToken>,
}
impl ProxyRequest {
	/// Creates a request with no headers, an empty body, and no session.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: Bytes::new(),
			session: None,
		}
	}

	/// Replaces the headers and derives the session from their `Authorization: Bearer` value.
	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.session = headers.get(header::AUTHORIZATION).and_then(SessionToken::from_bearer);
		self.headers = headers;

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();

		self
	}

	/// Overrides the session credential.
	pub fn with_session(mut self, session: SessionToken) -> Self {
		self.session = Some(session);

		self
	}
}

/// Successful dispatch outcome.
#[derive(Debug)]
pub enum Dispatch {
	/// Local/offline mode; nothing was forwarded.
	Skipped,
	/// Downstream response (any status) to relay verbatim.
	Relayed(reqwest::Response),
}

/// Sequences allow-listing, token acquisition, rewriting, and forwarding for each request.
///
/// The dispatcher holds only read-only configuration and shared clients, so one instance serves
/// every concurrent request.
#[derive(Clone)]
pub struct Dispatcher {
	/// Routes, allow-list, and local-mode switch.
	pub settings: Arc<ProxySettings>,
	/// Source of delegated tokens.
	pub token_provider: Arc<dyn TokenProvider>,
	/// Client used for the downstream call.
	pub http_client: ReqwestHttpClient,
}
impl Dispatcher {
	/// Creates a dispatcher over the provided configuration and collaborators.
	pub fn new(
		settings: Arc<ProxySettings>,
		token_provider: Arc<dyn TokenProvider>,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self { settings, token_provider, http_client }
	}

	/// Handles one request that arrived under `route`.
	///
	/// Errors map onto bare status codes at the inbound surface: [`Error::MissingSession`] → 401,
	/// [`Error::NotAllowed`] → 404, [`Error::TokenAcquisition`] and [`Error::Transport`] abandon
	/// the request. Downstream non-2xx responses are not errors; they come back as
	/// [`Dispatch::Relayed`].
	pub async fn handle(&self, route: &ProxyRoute, request: ProxyRequest) -> Result<Dispatch> {
		let rewrite = rewrite(&request.path, &route.target, &route.mount_path);
		let span = RequestSpan::new(&request.method, &rewrite.stripped_path, &route.target.id);
		let state = RequestState::new(span.clone());

		span.instrument(self.dispatch(route, request, rewrite, state)).await
	}

	async fn dispatch(
		&self,
		route: &ProxyRoute,
		request: ProxyRequest,
		rewrite: Rewrite,
		mut state: RequestState,
	) -> Result<Dispatch> {
		if self.settings.local_mode {
			tracing::info!("Skipping proxy for local or demo mode.");
			state.advance(ProxyStage::Skipped);

			return Ok(Dispatch::Skipped);
		}

		let Some(session) = request.session.as_ref() else {
			tracing::warn!(path = %request.path, "Rejected request without a bearer session token.");
			state.advance(ProxyStage::RejectedUnauthenticated);

			return Err(Error::MissingSession);
		};

		if rewrite.prefix_missing {
			tracing::error!(
				path = %request.path,
				mount_path = %route.mount_path,
				"Mount prefix missing from request path; proxying the unmodified path."
			);
		}

		if !self.settings.allow_list.is_allowed(&request.method, &rewrite.stripped_path) {
			let normalized =
				self.settings.allow_list.candidate(&request.method, &rewrite.stripped_path);

			tracing::warn!(
				method = %request.method,
				path = %rewrite.stripped_path,
				normalized = %normalized,
				"404 Unknown API."
			);
			state.advance(ProxyStage::RejectedNotAllowed);

			return Err(Error::NotAllowed {
				method: request.method.to_string(),
				path: rewrite.stripped_path,
				normalized,
			});
		}

		state.advance(ProxyStage::AllowListChecked);

		let bearer = match self
			.token_provider
			.on_behalf_of(session, &route.target)
			.await
			.and_then(|token| token.bearer_header())
		{
			Ok(bearer) => bearer,
			Err(source) => {
				tracing::error!(
					error = %source,
					cause = source.source().map(tracing::field::display),
					kind = %source.kind(),
					session = %session.fingerprint(),
					path = %request.path,
					"Could not get access token for request."
				);
				state.advance(ProxyStage::RejectedTokenFailure);

				return Err(Error::TokenAcquisition { api: route.target.id.clone(), source });
			},
		};

		state.advance(ProxyStage::TokenAcquired);

		let url = rewrite.downstream_url(&route.target);
		let mut headers = http::copy_end_to_end_headers(&request.headers);

		headers.insert(header::AUTHORIZATION, bearer);
		tracing::info!(from = %request.path, to = %url, "Proxying request.");

		let response = match self
			.http_client
			.request(request.method.clone(), url.as_str())
			.headers(headers)
			.body(request.body)
			.send()
			.await
		{
			Ok(response) => response,
			Err(e) => {
				let err = TransportError::from(e);

				tracing::error!(error = %err, to = %url, "Downstream request failed.");
				state.advance(ProxyStage::Abandoned);

				return Err(err.into());
			},
		};

		state.advance(ProxyStage::Forwarded);
		tracing::info!(
			status = response.status().as_u16(),
			method = %request.method,
			path = %request.path,
			"Received response from proxied request."
		);
		// The body is streamed by the caller after this stage.
		state.advance(ProxyStage::Completed);

		Ok(Dispatch::Relayed(response))
	}
}
impl Debug for Dispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("routes", &self.settings.routes.len())
			.field("allow_list", &self.settings.allow_list.entries().len())
			.field("local_mode", &self.settings.local_mode)
			.finish()
	}
}

struct RequestState {
	stage: ProxyStage,
	span: RequestSpan,
}
impl RequestState {
	fn new(span: RequestSpan) -> Self {
		obs::record_stage(ProxyStage::Received);

		Self { stage: ProxyStage::Received, span }
	}

	fn advance(&mut self, next: ProxyStage) {
		debug_assert!(self.stage.can_advance_to(next), "illegal transition {} -> {next}", self.stage);

		self.stage = next;
		self.span.record_stage(next);
		obs::record_stage(next);
	}
}
