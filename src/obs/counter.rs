// self
use crate::obs::{Stage, StageOutcome};

/// Counts one stage outcome; a no-op unless the `metrics` feature is enabled.
pub fn record_stage_outcome(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"bound_token_stage_total",
		"stage" => stage.label(),
		"outcome" => outcome.label()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (stage, outcome);
}
