//! Thread-safe in-memory [`RecordStore`] implementation for local development and tests.
//!
//! Besides plain storage, the store can simulate other writers racing the provisioner
//! ([`MemoryStore::simulate_concurrent_writes`]) and replay scripted failures
//! ([`MemoryStore::fail_next`]), and it counts every call so tests can assert how many writes
//! a flow attempted.

// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	record::{Record, RecordKey, RecordVersion},
	store::{RecordStore, StoreError, StoreFuture},
};

/// Store operation targeted by scripted failures and call counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
	/// [`RecordStore::create`].
	Create,
	/// [`RecordStore::get`].
	Get,
	/// [`RecordStore::update`].
	Update,
}

#[derive(Debug, Default)]
struct MemoryState {
	records: HashMap<RecordKey, Record>,
	last_version: u64,
	concurrent_writes: HashMap<RecordKey, usize>,
	scripted_failures: HashMap<StoreOp, VecDeque<StoreError>>,
	calls: HashMap<StoreOp, usize>,
}
impl MemoryState {
	fn next_version(&mut self) -> RecordVersion {
		self.last_version += 1;

		RecordVersion::new(self.last_version.to_string())
	}

	fn begin(&mut self, op: StoreOp) -> Result<(), StoreError> {
		*self.calls.entry(op).or_default() += 1;

		match self.scripted_failures.get_mut(&op).and_then(VecDeque::pop_front) {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	// Lands one pending foreign write on `key`, bumping its version.
	fn land_concurrent_write(&mut self, key: &RecordKey) {
		let pending = match self.concurrent_writes.get_mut(key) {
			Some(pending) if *pending > 0 => pending,
			_ => return,
		};

		*pending -= 1;

		let version = self.next_version();

		if let Some(stored) = self.records.get_mut(key) {
			stored.version = Some(version);
		}
	}
}

/// Thread-safe storage backend that keeps records in-process for tests and demos.
///
/// Versions are drawn from a single store-wide counter, so every write yields a stamp that
/// differs from all previously issued ones.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<MemoryState>>);
impl MemoryStore {
	/// Inserts `record` as if another component had created it, returning the stored copy.
	pub fn seed(&self, mut record: Record) -> Record {
		let mut state = self.0.write();

		record.version = Some(state.next_version());
		state.records.insert(record.key.clone(), record.clone());

		record
	}

	/// Returns the stored record without counting a call.
	pub fn snapshot(&self, key: &RecordKey) -> Option<Record> {
		self.0.read().records.get(key).cloned()
	}

	/// Makes the next `writes` updates of `key` race a foreign writer that lands first.
	pub fn simulate_concurrent_writes(&self, key: &RecordKey, writes: usize) {
		*self.0.write().concurrent_writes.entry(key.clone()).or_default() += writes;
	}

	/// Queues `err` to be returned by the next call to `op`.
	pub fn fail_next(&self, op: StoreOp, err: StoreError) {
		self.0.write().scripted_failures.entry(op).or_default().push_back(err);
	}

	/// Returns how many times `op` has been called.
	pub fn calls(&self, op: StoreOp) -> usize {
		self.0.read().calls.get(&op).copied().unwrap_or_default()
	}

	fn create_now(&self, mut record: Record) -> Result<Record, StoreError> {
		let mut state = self.0.write();

		state.begin(StoreOp::Create)?;

		if state.records.contains_key(&record.key) {
			return Err(StoreError::AlreadyExists { key: record.key });
		}

		record.version = Some(state.next_version());
		state.records.insert(record.key.clone(), record.clone());

		Ok(record)
	}

	fn get_now(&self, key: &RecordKey) -> Result<Record, StoreError> {
		let mut state = self.0.write();

		state.begin(StoreOp::Get)?;
		state.records.get(key).cloned().ok_or_else(|| StoreError::NotFound { key: key.clone() })
	}

	fn update_now(&self, mut record: Record) -> Result<Record, StoreError> {
		let mut state = self.0.write();

		state.begin(StoreOp::Update)?;
		state.land_concurrent_write(&record.key);

		let current = match state.records.get(&record.key) {
			Some(stored) => stored.version.clone(),
			None => return Err(StoreError::NotFound { key: record.key }),
		};

		if current != record.version {
			return Err(StoreError::Conflict {
				key: record.key,
				submitted: record.version.map(|v| v.as_str().to_owned()),
			});
		}

		record.version = Some(state.next_version());
		state.records.insert(record.key.clone(), record.clone());

		Ok(record)
	}
}
impl RecordStore for MemoryStore {
	fn create(&self, record: Record) -> StoreFuture<'_, Record> {
		Box::pin(async move { self.create_now(record) })
	}

	fn get<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Record> {
		Box::pin(async move { self.get_now(key) })
	}

	fn update(&self, record: Record) -> StoreFuture<'_, Record> {
		Box::pin(async move { self.update_now(record) })
	}
}
