//! Immutable route configuration, constructed once at startup and shared read-only.

// self
use crate::{_prelude::*, auth::ApiId, error::ConfigError, proxy::AllowList};

/// One downstream API reachable through the proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiTarget {
	/// Identifier (scope) delegated tokens are requested for.
	pub id: ApiId,
	/// Downstream base URL; only its origin and path are used.
	pub base_url: Url,
	/// Downstream path prefix without a trailing slash; empty when the base URL path is `/`.
	pub path_prefix: String,
}
impl ApiTarget {
	/// Creates a target whose path prefix is taken from `base_url`'s path.
	pub fn new(id: ApiId, base_url: Url) -> Result<Self, ConfigError> {
		let valid_scheme = matches!(base_url.scheme(), "http" | "https");

		if !valid_scheme
			|| base_url.host_str().is_none()
			|| base_url.query().is_some()
			|| base_url.fragment().is_some()
		{
			return Err(ConfigError::InvalidDownstream { url: base_url.to_string() });
		}

		let path_prefix = normalize_prefix(base_url.path());

		Ok(Self { id, base_url, path_prefix })
	}

	/// `scheme://host[:port]` part of the base URL.
	pub fn origin(&self) -> String {
		self.base_url.origin().ascii_serialization()
	}
}

/// Binds an inbound mount path (e.g. `/api/backend`) to a downstream API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyRoute {
	/// Normalized mount path: leading slash, no trailing slash, never `/`.
	pub mount_path: String,
	/// Downstream API served under the mount path.
	pub target: ApiTarget,
}
impl ProxyRoute {
	/// Validates and normalizes `mount_path` (`"backend/"` and `"/backend"` are equivalent).
	pub fn new(mount_path: impl AsRef<str>, target: ApiTarget) -> Result<Self, ConfigError> {
		let raw = mount_path.as_ref().trim();
		let invalid = || ConfigError::InvalidMountPath { path: raw.to_owned() };

		if raw.contains(['?', '#']) || raw.chars().any(char::is_whitespace) {
			return Err(invalid());
		}

		let normalized = normalize_prefix(raw);

		if normalized.is_empty() {
			return Err(invalid());
		}

		let mount_path =
			if normalized.starts_with('/') { normalized } else { format!("/{normalized}") };

		Ok(Self { mount_path, target })
	}
}

/// Everything the dispatcher reads: routes, allow-list, and the local-mode switch.
///
/// Built once before the server starts and shared behind an `Arc`; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct ProxySettings {
	/// Configured routes, in mount order.
	pub routes: Vec<ProxyRoute>,
	/// Allowed request shapes.
	pub allow_list: AllowList,
	/// Skip all proxying (local/demo deployments).
	pub local_mode: bool,
}
impl ProxySettings {
	/// Creates settings for the provided routes and allow-list with local mode off.
	pub fn new(routes: Vec<ProxyRoute>, allow_list: AllowList) -> Self {
		Self { routes, allow_list, local_mode: false }
	}

	/// Enables or disables the local/offline short-circuit.
	pub fn with_local_mode(mut self, local_mode: bool) -> Self {
		self.local_mode = local_mode;

		self
	}
}

/// Strips trailing slashes; `/` and the empty string collapse to the empty string.
pub(crate) fn normalize_prefix(raw: &str) -> String {
	raw.trim_end_matches('/').to_owned()
}
