//! Token write-back with a single, bounded conflict recovery.
//!
//! The write is a small state machine:
//!
//! ```text
//! Initial ──ok──────────────────────────────▶ Done
//!    │ conflict
//!    ▼
//! Refetching ──(re-read version, write once)──▶ Done | fatal
//! ```
//!
//! Only the version stamp of the refetched record is adopted; the in-memory payload, including
//! the new token, is written as-is. A second conflict means another writer keeps racing the
//! provisioner and is reported as [`Error::ConflictRetryExhausted`] without a third write.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::Provisioner,
	obs::{self, Stage},
	record::Record,
	store::RecordStore,
};

/// Record returned by [`Provisioner::apply_token`].
#[derive(Clone, Debug)]
pub struct Applied {
	/// Record as stored after the write.
	pub record: Record,
	/// `true` when the first write conflicted and the refetched version was used.
	pub retried: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UpdatePhase {
	Initial,
	Refetching,
}

impl Provisioner {
	/// Stores `token` under the record's `token` key, leaving other payload keys untouched.
	pub async fn apply_token(&self, record: Record, token: &TokenSecret) -> Result<Applied> {
		let key = record.key.clone();

		obs::observe(Stage::ApplyToken, &key, self.write_with_refetch(record, token)).await
	}

	async fn write_with_refetch(&self, mut record: Record, token: &TokenSecret) -> Result<Applied> {
		let mut phase = UpdatePhase::Initial;

		record.set_token(token);

		loop {
			let err = match <dyn RecordStore>::update(self.store.as_ref(), record.clone()).await {
				Ok(stored) => {
					let retried = phase == UpdatePhase::Refetching;

					if retried {
						self.metrics.record_retry();
					}

					tracing::info!(
						record = %stored.key,
						version = ?stored.version,
						retried,
						"Record updated."
					);

					return Ok(Applied { record: stored, retried });
				},
				Err(err) => err,
			};

			if !err.is_conflict() {
				return Err(err.into());
			}

			self.metrics.record_conflict();

			match phase {
				UpdatePhase::Initial => {
					tracing::info!(
						record = %record.key,
						version = ?record.version,
						"Record has been modified, refetching the current version."
					);

					let latest = <dyn RecordStore>::get(self.store.as_ref(), &record.key).await?;

					record.version = latest.version;
					phase = UpdatePhase::Refetching;
				},
				UpdatePhase::Refetching => {
					return Err(Error::ConflictRetryExhausted { key: record.key });
				},
			}
		}
	}
}
