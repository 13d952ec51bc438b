//! Observability helpers for proxied requests.
//!
//! Every inbound request walks the [`ProxyStage`] state machine:
//!
//! ```text
//! Received -> AllowListChecked -> TokenAcquired -> Forwarded -> Completed
//!     |              |                  |
//!     |              +-> RejectedTokenFailure  +-> Abandoned (downstream unreachable)
//!     +-> RejectedNotAllowed / RejectedUnauthenticated / Skipped
//! ```
//!
//! `Completed` is recorded once the response head is handed off; body streaming happens after
//! the request span closes and is not tracked as a stage.
//!
//! - `tracing` spans named `obo_proxy.request` carry `method`, `path`, `api`, and the current
//!   `stage`; token exchanges run inside `obo_proxy.token`.
//! - Enable `metrics` to increment `obo_proxy_request_stage_total{stage}` on every transition and
//!   `obo_proxy_token_exchange_total{outcome}` on every exchange.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Per-request lifecycle stage. No stage outlives its request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProxyStage {
	/// Request accepted by the inbound surface.
	Received,
	/// Method + path matched an allow-list template.
	AllowListChecked,
	/// Delegated token obtained for the target API.
	TokenAcquired,
	/// Request sent to the downstream host and a response head received.
	Forwarded,
	/// Response head handed to the inbound surface for relay. The body streams after this stage.
	Completed,
	/// Local/offline mode: nothing was proxied.
	Skipped,
	/// No bearer session credential was presented.
	RejectedUnauthenticated,
	/// Allow-list lookup failed.
	RejectedNotAllowed,
	/// Token provider failed.
	RejectedTokenFailure,
	/// Downstream host could not be reached.
	Abandoned,
}
impl ProxyStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProxyStage::Received => "received",
			ProxyStage::AllowListChecked => "allow_list_checked",
			ProxyStage::TokenAcquired => "token_acquired",
			ProxyStage::Forwarded => "forwarded",
			ProxyStage::Completed => "completed",
			ProxyStage::Skipped => "skipped",
			ProxyStage::RejectedUnauthenticated => "rejected_unauthenticated",
			ProxyStage::RejectedNotAllowed => "rejected_not_allowed",
			ProxyStage::RejectedTokenFailure => "rejected_token_failure",
			ProxyStage::Abandoned => "abandoned",
		}
	}

	/// Returns `true` for stages that end the request.
	pub const fn is_terminal(self) -> bool {
		matches!(
			self,
			ProxyStage::Completed
				| ProxyStage::Skipped
				| ProxyStage::RejectedUnauthenticated
				| ProxyStage::RejectedNotAllowed
				| ProxyStage::RejectedTokenFailure
				| ProxyStage::Abandoned
		)
	}

	/// Returns `true` when moving from `self` to `next` is a legal transition.
	pub const fn can_advance_to(self, next: ProxyStage) -> bool {
		matches!(
			(self, next),
			(
				ProxyStage::Received,
				ProxyStage::AllowListChecked
					| ProxyStage::Skipped
					| ProxyStage::RejectedUnauthenticated
					| ProxyStage::RejectedNotAllowed
			) | (
				ProxyStage::AllowListChecked,
				ProxyStage::TokenAcquired | ProxyStage::RejectedTokenFailure
			) | (ProxyStage::TokenAcquired, ProxyStage::Forwarded | ProxyStage::Abandoned)
				| (ProxyStage::Forwarded, ProxyStage::Completed)
		)
	}
}
impl Display for ProxyStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeOutcome {
	/// Entry to the exchange.
	Attempt,
	/// Token issued.
	Success,
	/// Failure propagated back to the dispatcher.
	Failure,
}
impl ExchangeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExchangeOutcome::Attempt => "attempt",
			ExchangeOutcome::Success => "success",
			ExchangeOutcome::Failure => "failure",
		}
	}
}
impl Display for ExchangeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
