//! Provisioning flow orchestrators.
//!
//! A [`Provisioner`] runs three stages against one record, strictly in order:
//!
//! 1. [`Provisioner::ensure_record`] creates the record or adopts an existing one.
//! 2. [`Provisioner::issue_token`] mints an audience-scoped token bound to that record.
//! 3. [`Provisioner::apply_token`] writes the token back, refetching once on a version
//!    conflict.
//!
//! [`Provisioner::run`] chains the stages and reports what happened.

mod apply_token;
mod ensure_record;
mod issue_token;
mod metrics;

pub use apply_token::Applied;
pub use ensure_record::Provisioned;
pub use self::metrics::ProvisionMetrics;

// self
use crate::{
	_prelude::*,
	config::ProvisionerConfig,
	issuer::TokenIssuer,
	obs::{self, Stage},
	record::{Record, RecordKey, RecordVersion},
	store::RecordStore,
};

/// Coordinates record provisioning and token issuance for one configuration snapshot.
///
/// The provisioner owns the storage and issuer handles plus the immutable configuration, so
/// individual stages only carry stage-specific state (the in-memory record copy and the
/// issued token).
#[derive(Clone)]
pub struct Provisioner {
	/// Configuration shared by every stage.
	pub config: ProvisionerConfig,
	/// Record storage backend.
	pub store: Arc<dyn RecordStore>,
	/// Identity service used for token issuance.
	pub issuer: Arc<dyn TokenIssuer>,
	/// Counters for adoptions and conflict recovery.
	pub metrics: Arc<ProvisionMetrics>,
}
impl Provisioner {
	/// Creates a provisioner for `config` backed by the provided store and issuer.
	pub fn new(
		config: ProvisionerConfig,
		store: Arc<dyn RecordStore>,
		issuer: Arc<dyn TokenIssuer>,
	) -> Self {
		Self { config, store, issuer, metrics: Default::default() }
	}

	/// Returns the key of the record this provisioner manages.
	pub fn record_key(&self) -> RecordKey {
		RecordKey::new(self.config.namespace.clone(), self.config.record_name.clone())
	}

	/// Runs the full sequence: ensure the record, issue a bound token, apply it.
	pub async fn run(&self) -> Result<ProvisionReport> {
		obs::observe(Stage::Run, &self.record_key(), async {
			let provisioned = self.ensure_record().await?;
			let token = self.issue_token(&provisioned.record.key.name).await?;
			let initial_version = provisioned.record.version.clone();
			let applied = self.apply_token(provisioned.record, &token).await?;

			Ok(ProvisionReport {
				record: applied.record,
				initial_version,
				adopted: provisioned.adopted,
				retried: applied.retried,
			})
		})
		.await
	}
}
impl Debug for Provisioner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Provisioner")
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Summary of a completed [`Provisioner::run`].
#[derive(Clone, Debug)]
pub struct ProvisionReport {
	/// Record as stored after the token was written.
	pub record: Record,
	/// Version observed right after create-or-adopt.
	pub initial_version: Option<RecordVersion>,
	/// Whether a pre-existing record was adopted instead of created.
	pub adopted: bool,
	/// Whether the token write needed the conflict refetch.
	pub retried: bool,
}
