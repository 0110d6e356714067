//! Kubernetes-backed [`RecordStore`] and [`TokenIssuer`].
//!
//! Records map onto `v1/Secret` objects and issuance onto the ServiceAccount `token`
//! subresource. API failures are classified from the status code and the machine-readable
//! `reason` of the returned `Status` object, never from message text.
//!
//! The backend remembers the last Secret it read or wrote for each key. An update replays that
//! object with only the payload, binding annotations, type and version swapped in, so labels,
//! owner references, finalizers and other fields written by other components survive the `PUT`.

// crates.io
use k8s_openapi::{
	ByteString,
	api::{
		authentication::v1::{
			BoundObjectReference, TokenRequest as KubeTokenRequest, TokenRequestSpec,
		},
		core::v1::{Secret, ServiceAccount},
	},
	apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::{
	Api, Client, Config,
	api::PostParams,
	config::KubeConfigOptions,
};
// self
use crate::{
	_prelude::*,
	auth::{IdentityName, Namespace, TokenRequest, TokenSecret},
	error::ConfigError,
	issuer::{IssueError, IssueFuture, TokenIssuer},
	record::{Record, RecordKey, RecordVersion},
	store::{RecordStore, StoreError, StoreFuture},
};

const REASON_ALREADY_EXISTS: &str = "AlreadyExists";
const REASON_CONFLICT: &str = "Conflict";

/// Loads cluster credentials, preferring the in-cluster service account and falling back to
/// the local kubeconfig (`KUBECONFIG` or `~/.kube/config`).
pub async fn load_config() -> Result<Config, ConfigError> {
	match Config::incluster() {
		Ok(config) => {
			tracing::info!(cluster_url = %config.cluster_url, "Using in-cluster configuration.");

			Ok(config)
		},
		Err(incluster) => {
			tracing::info!(
				reason = %incluster,
				"In-cluster configuration unavailable, falling back to kubeconfig."
			);

			Config::from_kubeconfig(&KubeConfigOptions::default())
				.await
				.map_err(ConfigError::cluster_config)
		},
	}
}

/// Record store and token issuer backed by a Kubernetes API server.
#[derive(Clone)]
pub struct KubeBackend {
	client: Client,
	observed: Arc<Mutex<HashMap<RecordKey, Secret>>>,
}
impl KubeBackend {
	/// Wraps an existing client.
	pub fn new(client: Client) -> Self {
		Self { client, observed: Default::default() }
	}

	/// Builds a backend from a loaded configuration.
	pub fn from_config(config: Config) -> Result<Self, ConfigError> {
		Client::try_from(config).map(Self::new).map_err(ConfigError::client_build)
	}

	/// Loads credentials with [`load_config`] and builds a backend from them.
	pub async fn connect() -> Result<Self, ConfigError> {
		Self::from_config(load_config().await?)
	}

	fn secrets(&self, namespace: &Namespace) -> Api<Secret> {
		Api::namespaced(self.client.clone(), namespace)
	}

	fn service_accounts(&self, namespace: &Namespace) -> Api<ServiceAccount> {
		Api::namespaced(self.client.clone(), namespace)
	}

	fn remember(&self, key: RecordKey, secret: Secret) -> Record {
		self.observed.lock().insert(key.clone(), secret.clone());

		secret_to_record(key, secret)
	}

	fn last_observed(&self, key: &RecordKey) -> Secret {
		self.observed.lock().get(key).cloned().unwrap_or_default()
	}
}
impl Debug for KubeBackend {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("KubeBackend(..)")
	}
}
impl RecordStore for KubeBackend {
	fn create(&self, record: Record) -> StoreFuture<'_, Record> {
		Box::pin(async move {
			let key = record.key.clone();
			let created = self
				.secrets(&key.namespace)
				.create(&PostParams::default(), &record_to_secret(record))
				.await
				.map_err(|err| map_store_error(&key, None, err))?;

			Ok(self.remember(key, created))
		})
	}

	fn get<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Record> {
		Box::pin(async move {
			let secret = self
				.secrets(&key.namespace)
				.get(&key.name)
				.await
				.map_err(|err| map_store_error(key, None, err))?;

			Ok(self.remember(key.clone(), secret))
		})
	}

	fn update(&self, record: Record) -> StoreFuture<'_, Record> {
		Box::pin(async move {
			let key = record.key.clone();
			let submitted = record.version.clone();
			let secret = apply_record(self.last_observed(&key), record);
			let replaced = self
				.secrets(&key.namespace)
				.replace(&key.name, &PostParams::default(), &secret)
				.await
				.map_err(|err| map_store_error(&key, submitted.as_ref(), err))?;

			Ok(self.remember(key, replaced))
		})
	}
}
impl TokenIssuer for KubeBackend {
	fn create_token<'a>(
		&'a self,
		identity: &'a IdentityName,
		namespace: &'a Namespace,
		request: &'a TokenRequest,
	) -> IssueFuture<'a, TokenSecret> {
		Box::pin(async move {
			let body = serde_json::to_vec(&to_kube_token_request(request))
				.map_err(|err| IssueError::Backend { message: err.to_string() })?;
			let response: KubeTokenRequest = self
				.service_accounts(namespace)
				.create_subresource("token", identity, &PostParams::default(), body)
				.await
				.map_err(|err| map_issue_error(identity, namespace, err))?;
			let status = response.status.ok_or_else(|| IssueError::Backend {
				message: "token request response carried no status".into(),
			})?;

			Ok(TokenSecret::new(status.token))
		})
	}
}

/// Converts a record into a fresh Secret submitted to the API server.
pub fn record_to_secret(record: Record) -> Secret {
	apply_record(Secret::default(), record)
}

/// Writes the fields a record owns onto `secret`, keeping everything else as observed.
pub fn apply_record(mut secret: Secret, record: Record) -> Secret {
	let Record { key, version, annotations, kind, payload } = record;
	let ObjectMeta { name, namespace, annotations: observed_annotations, resource_version, .. } =
		&mut secret.metadata;

	*name = Some(key.name.to_string());
	*namespace = Some(key.namespace.to_string());
	*observed_annotations = (!annotations.is_empty()).then_some(annotations);
	*resource_version = version.map(|v| v.as_str().to_owned());
	secret.data = Some(payload.into_iter().map(|(k, v)| (k, ByteString(v))).collect());
	secret.type_ = kind;

	secret
}

/// Converts a Secret returned by the API server into a record under `key`.
pub fn secret_to_record(key: RecordKey, secret: Secret) -> Record {
	Record {
		key,
		version: secret.metadata.resource_version.map(RecordVersion::new),
		annotations: secret.metadata.annotations.unwrap_or_default(),
		kind: secret.type_,
		payload: secret
			.data
			.unwrap_or_default()
			.into_iter()
			.map(|(k, ByteString(v))| (k, v))
			.collect(),
	}
}

fn to_kube_token_request(request: &TokenRequest) -> KubeTokenRequest {
	let bound = &request.bound_object_ref;

	KubeTokenRequest {
		spec: TokenRequestSpec {
			audiences: request.audiences.iter().map(ToString::to_string).collect(),
			expiration_seconds: Some(request.expiration_seconds),
			bound_object_ref: Some(BoundObjectReference {
				api_version: Some(bound.api_version.clone()),
				kind: Some(bound.kind.clone()),
				name: Some(bound.name.to_string()),
				uid: None,
			}),
		},
		..Default::default()
	}
}

fn map_store_error(
	key: &RecordKey,
	submitted: Option<&RecordVersion>,
	err: kube::Error,
) -> StoreError {
	match err {
		kube::Error::Api(response) => match (response.code, response.reason.as_str()) {
			(409, REASON_ALREADY_EXISTS) => StoreError::AlreadyExists { key: key.clone() },
			(409, REASON_CONFLICT) => StoreError::Conflict {
				key: key.clone(),
				submitted: submitted.map(|v| v.as_str().to_owned()),
			},
			(404, _) => StoreError::NotFound { key: key.clone() },
			(code, reason) => StoreError::Backend {
				message: format!("{code} {reason}: {}", response.message),
			},
		},
		other => StoreError::Backend { message: other.to_string() },
	}
}

fn map_issue_error(
	identity: &IdentityName,
	namespace: &Namespace,
	err: kube::Error,
) -> IssueError {
	match err {
		kube::Error::Api(response) => match response.code {
			404 => IssueError::IdentityNotFound {
				namespace: namespace.clone(),
				identity: identity.clone(),
			},
			401 | 403 => IssueError::PermissionDenied { message: response.message },
			429 | 500..=599 => IssueError::Unavailable { message: response.message },
			code => IssueError::Backend {
				message: format!("{code} {}: {}", response.reason, response.message),
			},
		},
		other => IssueError::Unavailable { message: other.to_string() },
	}
}
