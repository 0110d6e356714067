//! Provisions the bound gateway token once against the current cluster and exits.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use bound_token_provisioner::{
	cluster::KubeBackend, config::ProvisionerConfig, flows::Provisioner, issuer::TokenIssuer,
	store::RecordStore,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let config = ProvisionerConfig::from_env();
	let backend = Arc::new(KubeBackend::connect().await?);
	let store: Arc<dyn RecordStore> = backend.clone();
	let issuer: Arc<dyn TokenIssuer> = backend;
	let report = Provisioner::new(config, store, issuer).run().await?;

	tracing::info!(
		record = %report.record.key,
		adopted = report.adopted,
		retried = report.retried,
		version = ?report.record.version,
		"Bound token provisioned."
	);

	Ok(())
}
