//! Storage contracts and the built-in in-memory record store.

pub mod memory;

pub use memory::{MemoryStore, StoreOp};

// self
use crate::{
	_prelude::*,
	record::{Record, RecordKey},
};

/// Boxed future returned by [`RecordStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for versioned records.
///
/// Implementations must classify failures into [`StoreError`] variants instead of leaving
/// callers to inspect error text; the provisioner only recovers from
/// [`StoreError::AlreadyExists`] on create and [`StoreError::Conflict`] on update.
pub trait RecordStore
where
	Self: Send + Sync,
{
	/// Creates `record`, failing with [`StoreError::AlreadyExists`] if the key is taken.
	///
	/// Returns the stored record including its backend-assigned version.
	fn create(&self, record: Record) -> StoreFuture<'_, Record>;

	/// Fetches the latest version of the record stored under `key`.
	fn get<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Record>;

	/// Replaces the stored record if `record.version` still matches the stored version.
	///
	/// Fails with [`StoreError::Conflict`] when another writer got there first.
	fn update(&self, record: Record) -> StoreFuture<'_, Record>;
}

/// Classified failure produced by [`RecordStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A record with the same key already exists.
	#[error("Record `{key}` already exists.")]
	AlreadyExists {
		/// Key that collided.
		key: RecordKey,
	},
	/// No record exists under the key.
	#[error("Record `{key}` was not found.")]
	NotFound {
		/// Key that was looked up.
		key: RecordKey,
	},
	/// The submitted version no longer matches the stored one.
	#[error("Record `{key}` has been modified since version {submitted:?} was read.")]
	Conflict {
		/// Key that was written.
		key: RecordKey,
		/// Version carried by the rejected write.
		submitted: Option<String>,
	},
	/// Any other backend failure (authorization, transport, validation).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Returns `true` for version conflicts.
	pub fn is_conflict(&self) -> bool {
		matches!(self, Self::Conflict { .. })
	}

	/// Returns `true` when the key was already taken.
	pub fn is_already_exists(&self) -> bool {
		matches!(self, Self::AlreadyExists { .. })
	}
}
