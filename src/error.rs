//! Proxy-level error types shared across the dispatcher, token providers, and configuration.

// self
use crate::{
	_prelude::*,
	auth::{ApiId, IdentifierError},
	provider::{AuthorityDescriptorError, ProviderErrorKind},
};

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error produced while handling a single proxied request.
///
/// None of these are retried. The inbound surface maps each variant onto a bare status code and
/// never exposes the structured error to the caller.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network failure while reaching the downstream host.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The inbound request carried no bearer session credential.
	#[error("Request is missing a bearer session token.")]
	MissingSession,
	/// Method + normalized path is absent from the allow-list.
	#[error("Unknown API: {method} {path}, clean path: {normalized}.")]
	NotAllowed {
		/// HTTP method of the rejected request.
		method: String,
		/// Raw path (mount prefix stripped) of the rejected request.
		path: String,
		/// Normalized `"<METHOD> <template>"` candidate that failed the lookup.
		normalized: String,
	},
	/// The token provider could not issue a delegated token for the target API.
	#[error("Could not obtain an access token for `{api}`.")]
	TokenAcquisition {
		/// Target API the token was requested for.
		api: ApiId,
		/// Underlying provider failure.
		#[source]
		source: TokenError,
	},
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authority descriptor failed validation.
	#[error(transparent)]
	Authority(#[from] AuthorityDescriptorError),
	/// Identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),

	/// Downstream base URL cannot be proxied to.
	#[error("Downstream URL `{url}` must be an absolute http(s) URL without query or fragment.")]
	InvalidDownstream {
		/// Offending URL.
		url: String,
	},
	/// Mount path is not an absolute, non-root path.
	#[error("Mount path `{path}` must start with `/` and must not be the root path.")]
	InvalidMountPath {
		/// Offending mount path.
		path: String,
	},
	/// Allow-list entry is not of the form `"<METHOD> /<template>"`.
	#[error("Allow-list entry `{entry}` must look like `<METHOD> /<path-template>`.")]
	InvalidAllowListEntry {
		/// Offending entry.
		entry: String,
	},
	/// Built-in path pattern failed to compile.
	#[error(transparent)]
	Pattern(#[from] regex::Error),
	/// Allow-list file could not be read.
	#[error("Allow-list file `{path}` could not be read.")]
	AllowListFile {
		/// File path as configured.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure arm of an access-token exchange.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Session token was expired, revoked, or otherwise rejected as an assertion.
	#[error("Identity provider rejected the session token: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The user (or an administrator) must consent before the API can be called.
	#[error("Consent or interaction is required: {reason}.")]
	ConsentRequired {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Requested scope is unknown or not granted to this client.
	#[error("Requested scope was rejected: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token response parsed but violates a required invariant.
	#[error("Token endpoint response is unusable: {reason}.")]
	InvalidTokenResponse {
		/// Which invariant failed.
		reason: &'static str,
	},
	/// Transport failure while calling the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl TokenError {
	/// Coarse classification tag for logging and metrics.
	pub fn kind(&self) -> ProviderErrorKind {
		match self {
			Self::InvalidGrant { .. } => ProviderErrorKind::InvalidGrant,
			Self::InvalidClient { .. } => ProviderErrorKind::InvalidClient,
			Self::ConsentRequired { .. } => ProviderErrorKind::ConsentRequired,
			Self::InsufficientScope { .. } => ProviderErrorKind::InsufficientScope,
			Self::TokenEndpoint { .. }
			| Self::TokenResponseParse { .. }
			| Self::InvalidTokenResponse { .. }
			| Self::Transport(_) => ProviderErrorKind::Transient,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{host}`.")]
	Network {
		/// Host that could not be reached.
		host: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised while calling `host`.
	pub fn network(
		host: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { host: host.into(), source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		let host = e
			.url()
			.and_then(|url| url.host_str().map(ToOwned::to_owned))
			.unwrap_or_else(|| "<unknown>".into());

		Self::network(host, e)
	}
}
