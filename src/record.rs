//! Versioned key-value records that carry the provisioned token.

// self
use crate::{
	_prelude::*,
	auth::{IdentityName, Namespace, RecordName, TokenSecret},
};

/// Payload key holding the issued token.
pub const TOKEN_KEY: &str = "token";
/// Annotation naming the identity that owns the record.
pub const IDENTITY_ANNOTATION: &str = "kubernetes.io/service-account.name";
/// Record type understood by the storage backend as a service identity token holder.
pub const SERVICE_ACCOUNT_TOKEN_KIND: &str = "kubernetes.io/service-account-token";

/// Unique key identifying a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
	/// Namespace component.
	pub namespace: Namespace,
	/// Record name component.
	pub name: RecordName,
}
impl RecordKey {
	/// Builds a key for `name` inside `namespace`.
	pub fn new(namespace: Namespace, name: RecordName) -> Self {
		Self { namespace, name }
	}
}
impl Display for RecordKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// Opaque version stamp assigned by the storage backend.
///
/// Only compared for equality when detecting concurrent writers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordVersion(String);
impl RecordVersion {
	/// Wraps a backend-supplied version stamp.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw stamp.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for RecordVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// In-memory copy of a stored record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
	/// Record identity.
	pub key: RecordKey,
	/// Version observed when the copy was read; `None` before the first write.
	pub version: Option<RecordVersion>,
	/// Binding annotations attached to the record.
	pub annotations: BTreeMap<String, String>,
	/// Storage-level record type, when the backend has one.
	pub kind: Option<String>,
	/// Key-value payload.
	pub payload: BTreeMap<String, Vec<u8>>,
}
impl Record {
	/// Builds a new, unversioned record bound to `identity`, with an empty token entry.
	pub fn bound_to_identity(key: RecordKey, identity: &IdentityName) -> Self {
		Self {
			key,
			version: None,
			annotations: BTreeMap::from([(IDENTITY_ANNOTATION.into(), identity.to_string())]),
			kind: Some(SERVICE_ACCOUNT_TOKEN_KIND.into()),
			payload: BTreeMap::from([(TOKEN_KEY.into(), Vec::new())]),
		}
	}

	/// Returns the identity named by the binding annotation, if present.
	pub fn bound_identity(&self) -> Option<&str> {
		self.annotations.get(IDENTITY_ANNOTATION).map(String::as_str)
	}

	/// Returns the stored token bytes, if present.
	pub fn token(&self) -> Option<&[u8]> {
		self.payload.get(TOKEN_KEY).map(Vec::as_slice)
	}

	/// Sets the token entry, leaving every other payload key untouched.
	pub fn set_token(&mut self, token: &TokenSecret) {
		self.payload.insert(TOKEN_KEY.into(), token.as_bytes().to_vec());
	}
}
impl Debug for Record {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Record")
			.field("key", &self.key)
			.field("version", &self.version)
			.field("annotations", &self.annotations)
			.field("kind", &self.kind)
			.field("payload_keys", &self.payload.keys().collect::<Vec<_>>())
			.finish()
	}
}
