// self
use crate::{
	_prelude::*,
	auth::ClientId,
	provider::{AuthorityDescriptor, ClientAuthMethod},
};

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AuthorityDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`AuthorityDescriptor`] values.
#[derive(Debug)]
pub struct AuthorityDescriptorBuilder {
	/// Client identifier for the descriptor being constructed.
	pub client_id: ClientId,
	/// Token endpoint used for exchanges.
	pub token_endpoint: Option<Url>,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptorBuilder {
	/// Creates a new builder seeded with the provided client identifier.
	pub fn new(client_id: ClientId) -> Self {
		Self { client_id, token_endpoint: None, client_auth_method: ClientAuthMethod::default() }
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthorityDescriptor, AuthorityDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(AuthorityDescriptorError::MissingTokenEndpoint)?;

		validate_endpoint("token", &token_endpoint)?;

		Ok(AuthorityDescriptor {
			client_id: self.client_id,
			token_endpoint,
			client_auth_method: self.client_auth_method,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), AuthorityDescriptorError> {
	let loopback = url.host_str().is_some_and(|host| LOOPBACK_HOSTS.contains(&host));

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(AuthorityDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}
