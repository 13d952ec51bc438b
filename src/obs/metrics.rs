// self
use crate::obs::{ExchangeOutcome, ProxyStage};

/// Records a request stage transition via the global metrics recorder (when enabled).
pub fn record_stage(stage: ProxyStage) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("obo_proxy_request_stage_total", "stage" => stage.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = stage;
	}
}

/// Records a token exchange outcome via the global metrics recorder (when enabled).
pub fn record_exchange(outcome: ExchangeOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("obo_proxy_token_exchange_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_noops_without_a_global_recorder() {
		record_stage(ProxyStage::RejectedNotAllowed);
		record_exchange(ExchangeOutcome::Failure);
	}
}
