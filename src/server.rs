//! Inbound HTTP surface.
//!
//! Every configured route is mounted at `<mount>` and `<mount>/*path`, accepting any method. The
//! handler buffers the body, hands the request to the [`Dispatcher`], and turns the outcome into a
//! response: downstream responses are relayed verbatim (status, end-to-end headers, streamed body),
//! and every proxy-side failure becomes a bare status code with an empty body.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	body::Body,
	extract::{DefaultBodyLimit, Request, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{any, get},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	http,
	proxy::{Dispatch, Dispatcher, ProxyRequest, ProxyRoute},
};

/// Liveness probe path.
pub const IS_ALIVE_PATH: &str = "/internal/is_alive";
/// Readiness probe path.
pub const IS_READY_PATH: &str = "/internal/is_ready";

#[derive(Clone)]
struct RouteState {
	dispatcher: Dispatcher,
	route: Arc<ProxyRoute>,
	max_body_bytes: usize,
}

/// Builds the application router for every route in the dispatcher's settings.
pub fn router(dispatcher: Dispatcher, max_body_bytes: usize) -> Router {
	let mut app = Router::new().route(IS_ALIVE_PATH, get(health)).route(IS_READY_PATH, get(health));

	for route in &dispatcher.settings.routes {
		tracing::info!(api = %route.target.id, "Setting up proxy for '{}'.", route.mount_path);

		let state = RouteState {
			dispatcher: dispatcher.clone(),
			route: Arc::new(route.clone()),
			max_body_bytes,
		};
		// `/*path` does not match an empty tail, so `<mount>/` needs its own route.
		let trailing = format!("{}/", route.mount_path);
		let wildcard = format!("{}/*path", route.mount_path);

		app = app.merge(
			Router::new()
				.route(&route.mount_path, any(proxy))
				.route(&trailing, any(proxy))
				.route(&wildcard, any(proxy))
				.with_state(state),
		);
	}

	app.layer(DefaultBodyLimit::max(max_body_bytes)).layer(TraceLayer::new_for_http())
}

/// Binds `listen_addr` and serves `app` until ctrl-c.
pub async fn serve(listen_addr: SocketAddr, app: Router) -> std::io::Result<()> {
	let listener = TcpListener::bind(listen_addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "Proxy listening.");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}

/// Status code returned for a dispatcher failure.
pub fn status_for(error: &Error) -> StatusCode {
	match error {
		Error::MissingSession => StatusCode::UNAUTHORIZED,
		Error::NotAllowed { .. } => StatusCode::NOT_FOUND,
		Error::TokenAcquisition { .. } | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		Error::Transport(_) => StatusCode::BAD_GATEWAY,
	}
}

/// Converts a downstream response into an inbound one without touching status or body.
pub fn relay(response: reqwest::Response) -> Response {
	let status = response.status();
	let headers = http::copy_end_to_end_headers(response.headers());
	let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));

	*relayed.status_mut() = status;
	*relayed.headers_mut() = headers;

	relayed
}

async fn proxy(State(state): State<RouteState>, request: Request) -> Response {
	let (parts, body) = request.into_parts();
	let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
		Ok(body) => body,
		Err(e) => {
			tracing::warn!(error = %e, limit = state.max_body_bytes, "Could not buffer request body.");

			return StatusCode::PAYLOAD_TOO_LARGE.into_response();
		},
	};
	let path = parts
		.uri
		.path_and_query()
		.map(|path_and_query| path_and_query.as_str().to_owned())
		.unwrap_or_else(|| parts.uri.path().to_owned());
	let request = ProxyRequest::new(parts.method, path).with_headers(parts.headers).with_body(body);

	match state.dispatcher.handle(&state.route, request).await {
		Ok(Dispatch::Skipped) => StatusCode::NO_CONTENT.into_response(),
		Ok(Dispatch::Relayed(response)) => relay(response),
		Err(e) => status_for(&e).into_response(),
	}
}

async fn health() -> &'static str {
	"ok"
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Could not listen for the shutdown signal.");
	}

	tracing::info!("Shutting down proxy.");
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::ApiId,
		error::{TokenError, TransportError},
	};

	#[test]
	fn failures_map_to_bare_status_codes() {
		let api = ApiId::new("api://backend/.default").expect("Test API identifier should be valid.");

		assert_eq!(status_for(&Error::MissingSession), StatusCode::UNAUTHORIZED);
		assert_eq!(
			status_for(&Error::NotAllowed {
				method: "GET".into(),
				path: "/x".into(),
				normalized: "GET /x".into(),
			}),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			status_for(&Error::TokenAcquisition {
				api,
				source: TokenError::InvalidGrant { reason: "expired".into() },
			}),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(
			status_for(&Error::Transport(TransportError::Io(std::io::Error::other("reset")))),
			StatusCode::BAD_GATEWAY
		);
	}
}
