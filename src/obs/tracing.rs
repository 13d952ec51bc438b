// crates.io
use tracing_subscriber::{
	EnvFilter, fmt,
	layer::SubscriberExt,
	util::{SubscriberInitExt, TryInitError},
};
// self
use crate::{_prelude::*, auth::ApiId, obs::ProxyStage};

/// Log line format selected at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
	/// One JSON object per event, suitable for log shipping.
	#[default]
	Json,
	/// Human-readable multi-field lines for local development.
	Pretty,
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_subscriber(format: LogFormat) -> Result<(), TryInitError> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);

	match format {
		LogFormat::Json => registry
			.with(fmt::layer().json().flatten_event(true).with_current_span(true))
			.try_init(),
		LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
	}
}

/// Span covering one proxied request.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	span: tracing::Span,
}
impl RequestSpan {
	/// Opens a span for `method path` routed to `api`, starting at [`ProxyStage::Received`].
	pub fn new(method: &Method, path: &str, api: &ApiId) -> Self {
		let span = tracing::info_span!(
			"obo_proxy.request",
			method = %method,
			path,
			api = %api,
			stage = ProxyStage::Received.as_str(),
		);

		Self { span }
	}

	/// Updates the `stage` field.
	pub fn record_stage(&self, stage: ProxyStage) {
		self.span.record("stage", stage.as_str());
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> tracing::instrument::Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

/// Span covering one token exchange for `api`.
pub fn token_span(api: &ApiId) -> tracing::Span {
	tracing::info_span!("obo_proxy.token", api = %api)
}
