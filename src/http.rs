//! Outbound HTTP primitives shared by the token exchange and the forwarding step.
//!
//! [`ReqwestHttpClient`] never follows redirects: token endpoints must answer directly, and
//! downstream 3xx responses are relayed to the caller rather than chased by the proxy.
//! [`copy_end_to_end_headers`] filters the hop-by-hop headers that must not cross the proxy.

// std
use std::ops::Deref;
// crates.io
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Configure any custom [`ReqwestClient`] passed to [`ReqwestHttpClient::with_client`] with
/// `redirect(Policy::none())`; otherwise 3xx responses are followed instead of relayed.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds the default client with redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Returns `true` when `name` must not be forwarded in either direction.
///
/// `host` and `content-length` are included: the outbound client recomputes both for the
/// rewritten request.
pub fn is_hop_by_hop(name: &header::HeaderName) -> bool {
	matches!(
		name.as_str(),
		"connection"
			| "keep-alive"
			| "proxy-authenticate"
			| "proxy-authorization"
			| "te" | "trailer"
			| "transfer-encoding"
			| "upgrade"
			| "host" | "content-length"
	)
}

/// Copies every end-to-end header from `source`, dropping hop-by-hop headers and any header named
/// in the `Connection` header of `source`.
pub fn copy_end_to_end_headers(source: &HeaderMap) -> HeaderMap {
	let connection_scoped = source
		.get_all(header::CONNECTION)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(','))
		.map(|name| name.trim().to_ascii_lowercase())
		.filter(|name| !name.is_empty())
		.collect::<HashSet<_>>();
	let mut headers = HeaderMap::with_capacity(source.len());

	for (name, value) in source {
		if is_hop_by_hop(name) || connection_scoped.contains(name.as_str()) {
			continue;
		}

		headers.append(name.clone(), value.clone());
	}

	headers
}
