//! Provision long-lived, audience-scoped ServiceAccount tokens bound to a Secret, with
//! create-or-adopt provisioning and conflict-aware updates.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "kube")] pub mod cluster;
pub mod config;
pub mod error;
pub mod flows;
pub mod issuer;
pub mod obs;
pub mod record;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Test prelude with in-memory provisioner builders; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Audience, IdentityName, Namespace, RecordName},
		config::ProvisionerConfig,
		flows::Provisioner,
		issuer::{MemoryIssuer, TokenIssuer},
		store::{MemoryStore, RecordStore},
	};

	/// Builds a configuration with the compiled-in defaults except for the namespace.
	pub fn test_config(namespace: &str) -> ProvisionerConfig {
		ProvisionerConfig {
			namespace: Namespace::new(namespace).expect("Test namespace should be valid."),
			..ProvisionerConfig::default()
		}
	}

	/// Builds a configuration from explicit parameter values.
	pub fn test_config_with(
		record_name: &str,
		identity_name: &str,
		namespace: &str,
		audience: &str,
		ttl: StdDuration,
	) -> ProvisionerConfig {
		ProvisionerConfig {
			record_name: RecordName::new(record_name).expect("Test record name should be valid."),
			identity_name: IdentityName::new(identity_name)
				.expect("Test identity name should be valid."),
			namespace: Namespace::new(namespace).expect("Test namespace should be valid."),
			audience: Audience::new(audience).expect("Test audience should be valid."),
			ttl,
		}
	}

	/// Constructs a [`Provisioner`] backed by in-memory store and issuer instances, returning the
	/// concrete backends so tests can inject faults and inspect calls.
	pub fn build_memory_provisioner(
		config: ProvisionerConfig,
	) -> (Provisioner, Arc<MemoryStore>, Arc<MemoryIssuer>) {
		let store_backend = Arc::new(MemoryStore::default());
		let issuer_backend = Arc::new(MemoryIssuer::default());
		let store: Arc<dyn RecordStore> = store_backend.clone();
		let issuer: Arc<dyn TokenIssuer> = issuer_backend.clone();
		let provisioner = Provisioner::new(config, store, issuer);

		(provisioner, store_backend, issuer_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "kube")] pub use {k8s_openapi, kube};
#[cfg(feature = "cli")] use {color_eyre as _, tokio as _, tracing_subscriber as _};
#[cfg(test)] use {color_eyre as _, httpmock as _};
