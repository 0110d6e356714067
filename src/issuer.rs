//! Token issuance contracts and the built-in in-memory issuer.
//!
//! [`TokenIssuer`] is the provisioner's only dependency on the identity service. It receives a
//! fully built [`TokenRequest`] and returns the raw token exactly as the service produced it;
//! trimming and persistence are the caller's job.

pub mod memory;

pub use memory::{IssuedRequest, MemoryIssuer};

// self
use crate::{
	_prelude::*,
	auth::{IdentityName, Namespace, TokenRequest, TokenSecret},
};

/// Boxed future returned by [`TokenIssuer::create_token`].
pub type IssueFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IssueError>> + 'a + Send>>;

/// Identity service contract for minting bound tokens.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Requests a token for `identity` in `namespace`.
	fn create_token<'a>(
		&'a self,
		identity: &'a IdentityName,
		namespace: &'a Namespace,
		request: &'a TokenRequest,
	) -> IssueFuture<'a, TokenSecret>;
}

/// Classified failure produced by [`TokenIssuer`] implementations.
///
/// Every variant is fatal for a provisioning run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum IssueError {
	/// The identity does not exist in the namespace.
	#[error("Identity `{namespace}/{identity}` was not found.")]
	IdentityNotFound {
		/// Namespace that was searched.
		namespace: Namespace,
		/// Identity that was requested.
		identity: IdentityName,
	},
	/// The caller is not allowed to mint tokens for the identity.
	#[error("Token issuance was denied: {message}.")]
	PermissionDenied {
		/// Service-supplied reason string.
		message: String,
	},
	/// The identity service could not be reached or is overloaded.
	#[error("Identity service is unavailable: {message}.")]
	Unavailable {
		/// Transport- or service-supplied reason string.
		message: String,
	},
	/// Any other issuance failure, including malformed responses.
	#[error("Token issuance failed: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
