// crates.io
use tracing::Span;
// self
use crate::{obs::Stage, record::RecordKey};

/// Builds the `bound_token.stage` span for `stage` acting on `record`.
pub fn stage_span(stage: Stage, record: &RecordKey) -> Span {
	tracing::info_span!(
		"bound_token.stage",
		stage = stage.label(),
		namespace = %record.namespace,
		record = %record.name
	)
}
