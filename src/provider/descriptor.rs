//! Identity-provider descriptor consumed by the On-Behalf-Of flow.
//!
//! The descriptor carries only what the token exchange needs: the token endpoint, the client
//! identifier this application is registered under, and how that client authenticates.

/// Builder API for assembling authority descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::ClientId};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}
impl ClientAuthMethod {
	/// Returns the registered metadata name for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientAuthMethod::ClientSecretPost => "client_secret_post",
			ClientAuthMethod::ClientSecretBasic => "client_secret_basic",
		}
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable description of the identity provider that issues delegated tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDescriptor {
	/// Client identifier used in every exchange.
	pub client_id: ClientId,
	/// Token endpoint that accepts the jwt-bearer grant.
	pub token_endpoint: Url,
	/// Client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptor {
	/// Creates a new builder for the provided client identifier.
	pub fn builder(client_id: ClientId) -> AuthorityDescriptorBuilder {
		AuthorityDescriptorBuilder::new(client_id)
	}
}
