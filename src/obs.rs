//! Stage-level observability for provisioning runs.
//!
//! [`observe`] runs a stage inside a `bound_token.stage` span that carries the stage label and
//! the record it acts on, and counts how often the stage starts, succeeds and fails.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to export those counts as the `bound_token_stage_total` counter, labeled
//!   by `stage` + `outcome`.

mod counter;
mod span;

pub use counter::record_stage_outcome;
pub use span::stage_span;

// crates.io
use tracing::Instrument;
// self
use crate::{_prelude::*, record::RecordKey};

/// Provisioning stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Create-or-adopt of the record.
	EnsureRecord,
	/// Bound token issuance.
	IssueToken,
	/// Token write-back with conflict recovery.
	ApplyToken,
	/// The whole sequence.
	Run,
}
impl Stage {
	/// Stable label used in spans and metrics.
	pub const fn label(self) -> &'static str {
		match self {
			Self::EnsureRecord => "ensure_record",
			Self::IssueToken => "issue_token",
			Self::ApplyToken => "apply_token",
			Self::Run => "run",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.label())
	}
}

/// What happened to one stage execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// The stage began.
	Started,
	/// The stage returned `Ok`.
	Succeeded,
	/// The stage returned an error to its caller.
	Failed,
}
impl StageOutcome {
	/// Stable label used in metrics.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Started => "started",
			Self::Succeeded => "succeeded",
			Self::Failed => "failed",
		}
	}

	/// Classifies a finished stage.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Succeeded } else { Self::Failed }
	}
}

/// Runs `fut` as `stage` acting on `record`, inside the stage span, counting its outcome.
pub async fn observe<T, E, Fut>(stage: Stage, record: &RecordKey, fut: Fut) -> Result<T, E>
where
	Fut: Future<Output = Result<T, E>>,
	E: Display,
{
	let span = stage_span(stage, record);

	record_stage_outcome(stage, StageOutcome::Started);

	let result = fut.instrument(span.clone()).await;

	if let Err(err) = &result {
		span.in_scope(|| tracing::debug!(error = %err, "Stage failed."));
	}

	record_stage_outcome(stage, StageOutcome::of(&result));

	result
}
