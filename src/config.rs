//! Startup configuration sourced from command-line flags and environment variables.

// std
use std::{net::SocketAddr, path::PathBuf};
// crates.io
use clap::{Parser, ValueEnum};
// self
use crate::{
	_prelude::*,
	auth::{ApiId, ClientId, ClientSecret},
	error::ConfigError,
	obs::LogFormat,
	provider::{AuthorityDescriptor, ClientAuthMethod},
	proxy::{AllowList, ApiTarget, ProxyRoute, ProxySettings},
};

/// Deployment environment. `local` and `demo` run without an identity provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RuntimeEnv {
	/// Developer workstation.
	Local,
	/// Public demo without real backends.
	Demo,
	/// Shared development cluster.
	Dev,
	/// Production.
	#[default]
	Prod,
}
impl RuntimeEnv {
	/// Returns `true` when requests should short-circuit instead of being proxied.
	pub fn is_local(self) -> bool {
		matches!(self, Self::Local | Self::Demo)
	}
}

/// Client authentication style for the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ClientAuth {
	/// Credentials in the form body.
	#[default]
	ClientSecretPost,
	/// Credentials in an HTTP Basic header.
	ClientSecretBasic,
}
impl From<ClientAuth> for ClientAuthMethod {
	fn from(value: ClientAuth) -> Self {
		match value {
			ClientAuth::ClientSecretPost => Self::ClientSecretPost,
			ClientAuth::ClientSecretBasic => Self::ClientSecretBasic,
		}
	}
}

/// Proxy configuration.
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
	/// Address the inbound HTTP server binds to.
	#[arg(long, env = "PROXY_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
	pub listen_addr: SocketAddr,
	/// Inbound mount path the downstream API is served under.
	#[arg(long, env = "PROXY_MOUNT_PATH", default_value = "/api/backend")]
	pub mount_path: String,
	/// Downstream base URL; its path becomes the API path prefix.
	#[arg(long, env = "DOWNSTREAM_API_URL")]
	pub downstream_url: Url,
	/// Identifier (scope) of the downstream API.
	#[arg(long, env = "DOWNSTREAM_API_SCOPE")]
	pub downstream_scope: String,
	/// Client identifier registered with the identity provider.
	#[arg(long, env = "AZURE_APP_CLIENT_ID")]
	pub client_id: Option<String>,
	/// Client secret registered with the identity provider.
	#[arg(long, env = "AZURE_APP_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,
	/// Token endpoint of the identity provider.
	#[arg(long, env = "AZURE_OPENID_CONFIG_TOKEN_ENDPOINT")]
	pub token_endpoint: Option<Url>,
	/// How the client authenticates to the token endpoint.
	#[arg(long, env = "PROXY_CLIENT_AUTH", value_enum, default_value_t)]
	pub client_auth: ClientAuth,
	/// Deployment environment.
	#[arg(long, env = "RUNTIME_ENV", value_enum, default_value_t)]
	pub runtime_env: RuntimeEnv,
	/// Optional allow-list file, one `<METHOD> <path-template>` per line.
	#[arg(long, env = "PROXY_ALLOW_LIST_FILE")]
	pub allow_list_file: Option<PathBuf>,
	/// Largest inbound body accepted for forwarding.
	#[arg(long, env = "PROXY_MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
	pub max_body_bytes: usize,
	/// Log output format.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t)]
	pub log_format: LogFormat,
}
impl Config {
	/// Returns `true` when proxying is skipped entirely.
	pub fn local_mode(&self) -> bool {
		self.runtime_env.is_local()
	}

	/// Loads the allow-list file, or the built-in list when none is configured.
	pub fn allow_list(&self) -> Result<AllowList, ConfigError> {
		let Some(path) = &self.allow_list_file else {
			return AllowList::default_list();
		};
		let contents = std::fs::read_to_string(path).map_err(|source| {
			ConfigError::AllowListFile { path: path.display().to_string(), source }
		})?;

		AllowList::parse(contents.lines())
	}

	/// Builds the immutable dispatcher settings.
	pub fn proxy_settings(&self) -> Result<ProxySettings, ConfigError> {
		let target = ApiTarget::new(ApiId::new(&self.downstream_scope)?, self.downstream_url.clone())?;
		let route = ProxyRoute::new(&self.mount_path, target)?;

		Ok(ProxySettings::new(vec![route], self.allow_list()?).with_local_mode(self.local_mode()))
	}

	/// Builds the identity provider descriptor.
	pub fn authority(&self) -> Result<AuthorityDescriptor, ConfigError> {
		let client_id = ClientId::new(self.client_id.as_deref().unwrap_or_default())?;
		let mut builder =
			AuthorityDescriptor::builder(client_id).client_auth_method(self.client_auth.into());

		if let Some(endpoint) = &self.token_endpoint {
			builder = builder.token_endpoint(endpoint.clone());
		}

		Ok(builder.build()?)
	}

	/// Client secret; empty when unset, which only local mode tolerates.
	pub fn client_secret(&self) -> ClientSecret {
		ClientSecret::new(self.client_secret.clone().unwrap_or_default())
	}
}
