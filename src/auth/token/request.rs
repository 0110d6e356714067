//! Bound token request sent to the identity service.

// self
use crate::{
	_prelude::*,
	auth::{Audience, RecordName},
};

/// Object kind the issued token is bound to.
pub const BOUND_OBJECT_KIND: &str = "Secret";
/// API version of the bound object kind.
pub const BOUND_OBJECT_API_VERSION: &str = "v1";

/// Reference to the object whose lifetime the issued token is tied to.
///
/// The identity service validates the reference, so the token stops being accepted once the
/// referenced record is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundObjectRef {
	/// Kind of the bound object.
	pub kind: String,
	/// API version of the bound object.
	pub api_version: String,
	/// Name of the bound object.
	pub name: RecordName,
}
impl BoundObjectRef {
	/// References the storage record named `name`.
	pub fn record(name: RecordName) -> Self {
		Self { kind: BOUND_OBJECT_KIND.into(), api_version: BOUND_OBJECT_API_VERSION.into(), name }
	}
}

/// Audience-scoped, record-bound token request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	/// Intended recipients of the token.
	pub audiences: Vec<Audience>,
	/// Requested lifetime in whole seconds.
	pub expiration_seconds: i64,
	/// Object the token is bound to.
	pub bound_object_ref: BoundObjectRef,
}
impl TokenRequest {
	/// Builds a request for `audience`, valid for `ttl`, bound to the record `record_name`.
	///
	/// Sub-second precision is dropped and lifetimes beyond `i64::MAX` seconds saturate.
	pub fn bound_to_record(audience: Audience, ttl: StdDuration, record_name: RecordName) -> Self {
		Self {
			audiences: vec![audience],
			expiration_seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
			bound_object_ref: BoundObjectRef::record(record_name),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_binds_to_secret_and_expresses_ttl_in_seconds() {
		let request = TokenRequest::bound_to_record(
			Audience::new("istio-ca").expect("Audience fixture should be valid."),
			StdDuration::from_secs(31_536_000) + StdDuration::from_millis(999),
			RecordName::new("gateway-sa-secret").expect("Record name fixture should be valid."),
		);

		assert_eq!(request.expiration_seconds, 31_536_000);
		assert_eq!(request.audiences.len(), 1);
		assert_eq!(request.audiences[0].as_str(), "istio-ca");
		assert_eq!(request.bound_object_ref.kind, "Secret");
		assert_eq!(request.bound_object_ref.api_version, "v1");
		assert_eq!(request.bound_object_ref.name.as_str(), "gateway-sa-secret");
	}

	#[test]
	fn oversized_ttl_saturates() {
		let request = TokenRequest::bound_to_record(
			Audience::new("istio-ca").expect("Audience fixture should be valid."),
			StdDuration::from_secs(u64::MAX),
			RecordName::new("gateway-sa-secret").expect("Record name fixture should be valid."),
		);

		assert_eq!(request.expiration_seconds, i64::MAX);
	}
}
