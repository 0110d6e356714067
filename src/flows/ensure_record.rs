//! Create-or-adopt provisioning of the token record.
//!
//! The provisioner first tries to create the record with an empty token entry and the identity
//! binding annotation. A name collision is expected on every run after the first one and
//! switches to adoption: the existing record is fetched and returned as-is. Any other creation
//! failure, or a failed adoption fetch (for example when a concurrent deleter removed the
//! record in between), aborts the run.

// self
use crate::{
	_prelude::*,
	flows::Provisioner,
	obs::{self, Stage},
	record::Record,
	store::RecordStore,
};

/// Record returned by [`Provisioner::ensure_record`].
#[derive(Clone, Debug)]
pub struct Provisioned {
	/// Record as currently stored, including its backend version.
	pub record: Record,
	/// `true` when the record already existed and was adopted.
	pub adopted: bool,
}

impl Provisioner {
	/// Ensures the configured record exists, creating it or adopting a pre-existing one.
	pub async fn ensure_record(&self) -> Result<Provisioned> {
		let key = self.record_key();

		obs::observe(Stage::EnsureRecord, &key, async {
			let draft = Record::bound_to_identity(key.clone(), &self.config.identity_name);

			match <dyn RecordStore>::create(self.store.as_ref(), draft).await {
				Ok(record) => {
					tracing::info!(record = %key, version = ?record.version, "Record created.");

					Ok(Provisioned { record, adopted: false })
				},
				Err(err) if err.is_already_exists() => {
					tracing::info!(record = %key, "Record already exists, adopting it.");

					let record = <dyn RecordStore>::get(self.store.as_ref(), &key).await?;

					self.warn_on_foreign_binding(&record);
					self.metrics.record_adoption();

					Ok(Provisioned { record, adopted: true })
				},
				Err(err) => Err(err.into()),
			}
		})
		.await
	}

	fn warn_on_foreign_binding(&self, record: &Record) {
		let expected = self.config.identity_name.as_str();

		match record.bound_identity() {
			Some(bound) if bound == expected => (),
			bound => tracing::warn!(
				record = %record.key,
				expected,
				bound = ?bound,
				"Adopted record is bound to a different identity."
			),
		}
	}
}
