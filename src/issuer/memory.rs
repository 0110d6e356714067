//! In-process [`TokenIssuer`] that mints deterministic tokens for tests and demos.

// std
use std::collections::{HashSet, VecDeque};
// self
use crate::{
	_prelude::*,
	auth::{IdentityName, Namespace, TokenRequest, TokenSecret},
	issuer::{IssueError, IssueFuture, TokenIssuer},
};

/// Token request captured by [`MemoryIssuer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedRequest {
	/// Identity the token was minted for.
	pub identity: IdentityName,
	/// Namespace of the identity.
	pub namespace: Namespace,
	/// Request as received.
	pub request: TokenRequest,
}

#[derive(Debug, Default)]
struct IssuerState {
	missing: HashSet<(Namespace, IdentityName)>,
	padding: String,
	scripted_failures: VecDeque<IssueError>,
	requests: Vec<IssuedRequest>,
}

/// Issuer that accepts every identity unless told otherwise and records each request.
///
/// Minted tokens look like `memory.<namespace>.<identity>.<n>`, wrapped in the configured
/// padding to mimic services that return trailing newlines.
#[derive(Clone, Debug, Default)]
pub struct MemoryIssuer(Arc<Mutex<IssuerState>>);
impl MemoryIssuer {
	/// Wraps every minted token in `padding` on both sides.
	pub fn with_padding(self, padding: impl Into<String>) -> Self {
		self.set_padding(padding);

		self
	}

	/// Replaces the padding applied to tokens minted from now on.
	pub fn set_padding(&self, padding: impl Into<String>) {
		self.0.lock().padding = padding.into();
	}

	/// Makes requests for `identity` in `namespace` fail with [`IssueError::IdentityNotFound`].
	pub fn forget_identity(&self, namespace: Namespace, identity: IdentityName) {
		self.0.lock().missing.insert((namespace, identity));
	}

	/// Queues `err` to be returned by the next request.
	pub fn fail_next(&self, err: IssueError) {
		self.0.lock().scripted_failures.push_back(err);
	}

	/// Returns every request received so far, including failed ones.
	pub fn requests(&self) -> Vec<IssuedRequest> {
		self.0.lock().requests.clone()
	}

	fn mint_now(
		&self,
		identity: &IdentityName,
		namespace: &Namespace,
		request: &TokenRequest,
	) -> Result<TokenSecret, IssueError> {
		let mut state = self.0.lock();

		state.requests.push(IssuedRequest {
			identity: identity.clone(),
			namespace: namespace.clone(),
			request: request.clone(),
		});

		if let Some(err) = state.scripted_failures.pop_front() {
			return Err(err);
		}
		if state.missing.contains(&(namespace.clone(), identity.clone())) {
			return Err(IssueError::IdentityNotFound {
				namespace: namespace.clone(),
				identity: identity.clone(),
			});
		}

		let serial = state.requests.len();

		Ok(TokenSecret::new(format!(
			"{pad}memory.{namespace}.{identity}.{serial}{pad}",
			pad = state.padding
		)))
	}
}
impl TokenIssuer for MemoryIssuer {
	fn create_token<'a>(
		&'a self,
		identity: &'a IdentityName,
		namespace: &'a Namespace,
		request: &'a TokenRequest,
	) -> IssueFuture<'a, TokenSecret> {
		Box::pin(async move { self.mint_now(identity, namespace, request) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{Audience, RecordName};

	fn fixtures() -> (IdentityName, Namespace, TokenRequest) {
		let identity =
			IdentityName::new("higress-gateway").expect("Identity fixture should be valid.");
		let namespace =
			Namespace::new("higress-system").expect("Namespace fixture should be valid.");
		let request = TokenRequest::bound_to_record(
			Audience::new("istio-ca").expect("Audience fixture should be valid."),
			StdDuration::from_secs(3_600),
			RecordName::new("gateway-sa-secret").expect("Record name fixture should be valid."),
		);

		(identity, namespace, request)
	}

	#[tokio::test]
	async fn mints_padded_tokens_and_records_requests() {
		let issuer = MemoryIssuer::default().with_padding("\n");
		let (identity, namespace, request) = fixtures();
		let token = issuer
			.create_token(&identity, &namespace, &request)
			.await
			.expect("Issuance should succeed for known identities.");

		assert_eq!(token.expose(), "\nmemory.higress-system.higress-gateway.1\n");
		assert_eq!(issuer.requests().len(), 1);
		assert_eq!(issuer.requests()[0].request, request);
	}

	#[tokio::test]
	async fn forgotten_identities_are_not_found() {
		let issuer = MemoryIssuer::default();
		let (identity, namespace, request) = fixtures();

		issuer.forget_identity(namespace.clone(), identity.clone());

		let err = issuer
			.create_token(&identity, &namespace, &request)
			.await
			.expect_err("Issuance should fail for unknown identities.");

		assert_eq!(err, IssueError::IdentityNotFound { namespace, identity });
	}

	#[tokio::test]
	async fn scripted_failures_take_precedence() {
		let issuer = MemoryIssuer::default();
		let (identity, namespace, request) = fixtures();

		issuer.fail_next(IssueError::Unavailable { message: "503".into() });

		assert!(matches!(
			issuer.create_token(&identity, &namespace, &request).await,
			Err(IssueError::Unavailable { .. })
		));
		assert!(issuer.create_token(&identity, &namespace, &request).await.is_ok());
	}
}
