// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use bound_token_provisioner::{
	auth::{IdentityName, Namespace, RecordName, TokenSecret},
	cluster::KubeBackend,
	config::ProvisionerConfig,
	error::Error,
	flows::Provisioner,
	issuer::{IssueError, TokenIssuer},
	kube::{Client, Config},
	record::{Record, RecordKey, RecordVersion},
	store::{RecordStore, StoreError},
};

const NAMESPACE: &str = "higress-system";
const SECRETS_PATH: &str = "/api/v1/namespaces/higress-system/secrets";
const SECRET_PATH: &str = "/api/v1/namespaces/higress-system/secrets/gateway-sa-secret";
const TOKEN_PATH: &str = "/api/v1/namespaces/higress-system/serviceaccounts/higress-gateway/token";

fn build_backend(server: &MockServer) -> KubeBackend {
	let uri = server.base_url().parse().expect("Mock server URL should parse as a URI.");
	let client =
		Client::try_from(Config::new(uri)).expect("Client should build against the mock server.");

	KubeBackend::new(client)
}

fn build_provisioner(backend: KubeBackend) -> Provisioner {
	let backend = Arc::new(backend);
	let store: Arc<dyn RecordStore> = backend.clone();
	let issuer: Arc<dyn TokenIssuer> = backend;

	Provisioner::new(ProvisionerConfig::default(), store, issuer)
}

fn record_key() -> RecordKey {
	RecordKey::new(
		Namespace::new(NAMESPACE).expect("Namespace should be valid for cluster tests."),
		RecordName::new("gateway-sa-secret").expect("Record name should be valid."),
	)
}

fn secret_json(resource_version: &str, token_b64: &str) -> String {
	format!(
		"{{\"apiVersion\":\"v1\",\"kind\":\"Secret\",\"metadata\":{{\"name\":\"gateway-sa-secret\",\
		 \"namespace\":\"{NAMESPACE}\",\"resourceVersion\":\"{resource_version}\",\"annotations\":\
		 {{\"kubernetes.io/service-account.name\":\"higress-gateway\"}}}},\"type\":\
		 \"kubernetes.io/service-account-token\",\"data\":{{\"token\":\"{token_b64}\"}}}}"
	)
}

fn status_json(code: u16, reason: &str) -> String {
	format!(
		"{{\"apiVersion\":\"v1\",\"kind\":\"Status\",\"status\":\"Failure\",\
		 \"message\":\"mock {reason}\",\"reason\":\"{reason}\",\"code\":{code}}}"
	)
}

fn token_response_json(token: &str) -> String {
	format!(
		"{{\"apiVersion\":\"authentication.k8s.io/v1\",\"kind\":\"TokenRequest\",\
		 \"spec\":{{\"audiences\":[\"istio-ca\"]}},\"status\":{{\"token\":\"{token}\",\
		 \"expirationTimestamp\":\"2027-10-18T00:00:00Z\"}}}}"
	)
}

#[tokio::test]
async fn fresh_cluster_creates_secret_issues_and_writes_token() {
	let server = MockServer::start_async().await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(SECRETS_PATH)
				.body_includes("\"kubernetes.io/service-account.name\":\"higress-gateway\"")
				.body_includes("\"type\":\"kubernetes.io/service-account-token\"");
			then.status(201).header("content-type", "application/json").body(secret_json("1", ""));
		})
		.await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("\"audiences\":[\"istio-ca\"]")
				.body_includes("\"expirationSeconds\":31536000")
				.body_includes("\"kind\":\"Secret\"")
				.body_includes("\"name\":\"gateway-sa-secret\"");
			then.status(201)
				.header("content-type", "application/json")
				.body(token_response_json("kube-issued-token\\n"));
		})
		.await;
	let replace = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(SECRET_PATH)
				.body_includes("\"resourceVersion\":\"1\"")
				.body_includes("\"token\":\"a3ViZS1pc3N1ZWQtdG9rZW4=\"");
			then.status(200)
				.header("content-type", "application/json")
				.body(secret_json("2", "a3ViZS1pc3N1ZWQtdG9rZW4="));
		})
		.await;
	let report = build_provisioner(build_backend(&server))
		.run()
		.await
		.expect("Provisioning against the mock API server should succeed.");

	create.assert_async().await;
	token.assert_async().await;
	replace.assert_async().await;

	assert!(!report.adopted);
	assert!(!report.retried);
	assert_eq!(report.initial_version, Some(RecordVersion::new("1")));
	assert_eq!(report.record.version, Some(RecordVersion::new("2")));
	assert_eq!(report.record.token(), Some(&b"kube-issued-token"[..]));
}

#[tokio::test]
async fn already_exists_switches_to_adoption() {
	let server = MockServer::start_async().await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path(SECRETS_PATH);
			then.status(409)
				.header("content-type", "application/json")
				.body(status_json(409, "AlreadyExists"));
		})
		.await;
	let fetch = server
		.mock_async(|when, then| {
			when.method(GET).path(SECRET_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(secret_json("7", "c3RhbGU="));
		})
		.await;
	let provisioned = build_provisioner(build_backend(&server))
		.ensure_record()
		.await
		.expect("An existing secret should be adopted.");

	create.assert_async().await;
	fetch.assert_async().await;

	assert!(provisioned.adopted);
	assert_eq!(provisioned.record.version, Some(RecordVersion::new("7")));
	assert_eq!(provisioned.record.token(), Some(&b"stale"[..]));
	assert_eq!(provisioned.record.bound_identity(), Some("higress-gateway"));
}

#[tokio::test]
async fn adopted_secret_keeps_foreign_metadata_on_write() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(SECRETS_PATH);
			then.status(409)
				.header("content-type", "application/json")
				.body(status_json(409, "AlreadyExists"));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(SECRET_PATH);
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"apiVersion\":\"v1\",\"kind\":\"Secret\",\"metadata\":{{\"name\":\
				 \"gateway-sa-secret\",\"namespace\":\"{NAMESPACE}\",\"resourceVersion\":\"7\",\
				 \"labels\":{{\"app.kubernetes.io/managed-by\":\"Helm\"}},\"finalizers\":\
				 [\"example.com/keep\"],\"ownerReferences\":[{{\"apiVersion\":\"apps/v1\",\
				 \"kind\":\"Deployment\",\"name\":\"higress-gateway\",\"uid\":\
				 \"6f1f4c1e-0d2a-4b8e-9a55-1c2d3e4f5a6b\"}}],\"annotations\":{{\
				 \"kubernetes.io/service-account.name\":\"higress-gateway\"}}}},\"type\":\
				 \"kubernetes.io/service-account-token\",\"data\":{{\"token\":\"\"}}}}"
			));
		})
		.await;
	let replace = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(SECRET_PATH)
				.body_includes("\"resourceVersion\":\"7\"")
				.body_includes("\"labels\":{\"app.kubernetes.io/managed-by\":\"Helm\"}")
				.body_includes("\"finalizers\":[\"example.com/keep\"]")
				.body_includes("\"uid\":\"6f1f4c1e-0d2a-4b8e-9a55-1c2d3e4f5a6b\"")
				.body_includes("\"token\":\"a3ViZS1pc3N1ZWQtdG9rZW4=\"");
			then.status(200)
				.header("content-type", "application/json")
				.body(secret_json("8", "a3ViZS1pc3N1ZWQtdG9rZW4="));
		})
		.await;
	let provisioner = build_provisioner(build_backend(&server));
	let provisioned =
		provisioner.ensure_record().await.expect("An existing secret should be adopted.");
	let applied = provisioner
		.apply_token(provisioned.record, &TokenSecret::new("kube-issued-token"))
		.await
		.expect("Writing the token onto the adopted secret should succeed.");

	replace.assert_async().await;

	assert!(!applied.retried);
	assert_eq!(applied.record.version, Some(RecordVersion::new("8")));
}

#[tokio::test]
async fn update_conflict_refetches_version_and_retries_once() {
	let server = MockServer::start_async().await;
	let stale_write = server
		.mock_async(|when, then| {
			when.method(PUT).path(SECRET_PATH).body_includes("\"resourceVersion\":\"1\"");
			then.status(409)
				.header("content-type", "application/json")
				.body(status_json(409, "Conflict"));
		})
		.await;
	let refetch = server
		.mock_async(|when, then| {
			when.method(GET).path(SECRET_PATH);
			then.status(200).header("content-type", "application/json").body(secret_json("2", ""));
		})
		.await;
	let fresh_write = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(SECRET_PATH)
				.body_includes("\"resourceVersion\":\"2\"")
				.body_includes("\"token\":\"a3ViZS1pc3N1ZWQtdG9rZW4=\"");
			then.status(200)
				.header("content-type", "application/json")
				.body(secret_json("3", "a3ViZS1pc3N1ZWQtdG9rZW4="));
		})
		.await;
	let provisioner = build_provisioner(build_backend(&server));
	let identity = IdentityName::new("higress-gateway").expect("Identity should be valid.");
	let mut record = Record::bound_to_identity(record_key(), &identity);

	record.version = Some(RecordVersion::new("1"));

	let applied = provisioner
		.apply_token(record, &TokenSecret::new("kube-issued-token"))
		.await
		.expect("A single conflict should be recovered.");

	stale_write.assert_async().await;
	refetch.assert_async().await;
	fresh_write.assert_async().await;

	assert!(applied.retried);
	assert_eq!(applied.record.version, Some(RecordVersion::new("3")));
}

#[tokio::test]
async fn api_failures_are_classified_by_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(SECRET_PATH);
			then.status(404)
				.header("content-type", "application/json")
				.body(status_json(404, "NotFound"));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(403)
				.header("content-type", "application/json")
				.body(status_json(403, "Forbidden"));
		})
		.await;

	let backend = build_backend(&server);
	let key = record_key();
	let store_err = <dyn RecordStore>::get(&backend, &key)
		.await
		.expect_err("A missing secret should surface as an error.");

	assert_eq!(store_err, StoreError::NotFound { key: key.clone() });

	let provisioner = build_provisioner(backend);
	let issue_err = provisioner
		.issue_token(&key.name)
		.await
		.expect_err("A forbidden token request should surface as an error.");

	assert!(matches!(issue_err, Error::Issue(IssueError::PermissionDenied { .. })));
}
