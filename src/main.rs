//! `obo-proxy` binary: parse configuration, install logging, and serve until ctrl-c.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::eyre::WrapErr;
// self
use obo_proxy::{
	config::Config,
	flows::OboTokenProvider,
	http::ReqwestHttpClient,
	obs,
	provider::TokenProvider,
	proxy::{Dispatcher, ProxySettings},
	server,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let config = Config::parse();

	obs::init_subscriber(config.log_format).wrap_err("failed to install the tracing subscriber")?;

	let settings = Arc::new(config.proxy_settings().wrap_err("invalid proxy configuration")?);
	let http_client = ReqwestHttpClient::new()?;
	let token_provider = token_provider(&config, &settings, http_client.clone())?;
	let dispatcher = Dispatcher::new(settings, token_provider, http_client);

	server::serve(config.listen_addr, server::router(dispatcher, config.max_body_bytes))
		.await
		.wrap_err("proxy server failed")
}

fn token_provider(
	config: &Config,
	settings: &ProxySettings,
	http_client: ReqwestHttpClient,
) -> color_eyre::Result<Arc<dyn TokenProvider>> {
	if settings.local_mode {
		tracing::info!(env = ?config.runtime_env, "Local mode: requests will not be proxied.");

		return Ok(Arc::new(LocalTokenProvider));
	}

	let authority = config.authority().wrap_err("invalid identity provider configuration")?;

	Ok(Arc::new(OboTokenProvider::new(authority, config.client_secret(), http_client)))
}

/// Placeholder provider for local mode, where the dispatcher never asks for a token.
struct LocalTokenProvider;
impl TokenProvider for LocalTokenProvider {
	fn on_behalf_of<'a>(
		&'a self,
		_: &'a obo_proxy::auth::SessionToken,
		target: &'a obo_proxy::proxy::ApiTarget,
	) -> obo_proxy::provider::TokenFuture<'a> {
		Box::pin(async move {
			Err(obo_proxy::error::TokenError::TokenEndpoint {
				message: format!("local mode has no identity provider for `{}`", target.id),
				status: None,
			})
		})
	}
}
