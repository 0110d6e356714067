//! Provisioner-level error types shared across flows, stores, and issuers.

// self
use crate::{_prelude::*, record::RecordKey};

/// Provisioner-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical provisioner error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Token issuance failure.
	#[error("{0}")]
	Issue(
		#[from]
		#[source]
		crate::issuer::IssueError,
	),
	/// Local configuration or client setup problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The record update conflicted again after the single refetch-and-retry.
	#[error("Record `{key}` was modified concurrently again after refetching; giving up.")]
	ConflictRetryExhausted {
		/// Record that kept conflicting.
		key: RecordKey,
	},
}

/// Configuration and client setup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Neither in-cluster nor kubeconfig credentials could be loaded.
	#[error("Unable to load cluster configuration.")]
	ClusterConfig {
		/// Underlying loader failure.
		#[source]
		source: BoxError,
	},
	/// The cluster client could not be constructed from the loaded configuration.
	#[error("Cluster client could not be constructed.")]
	ClientBuild {
		/// Underlying client builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a credential loader failure inside [`ConfigError`].
	pub fn cluster_config(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::ClusterConfig { source: Box::new(src) }
	}

	/// Wraps a client builder failure inside [`ConfigError`].
	pub fn client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::ClientBuild { source: Box::new(src) }
	}
}
