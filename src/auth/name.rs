//! Validated names for the objects the provisioner touches.
//!
//! Records, identities, namespaces and audiences share one set of rules: non-empty, free of
//! whitespace, and no longer than the Kubernetes object-name ceiling of 253 bytes. The kind
//! marker only separates the types and labels errors and `Debug` output.

// std
use std::{
	borrow::Borrow,
	cmp::Ordering,
	hash::{Hash, Hasher},
	marker::PhantomData,
	ops::Deref,
};
// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::_prelude::*;

/// Longest accepted name, in bytes.
pub const NAME_MAX_LEN: usize = 253;

/// Marker trait tying a [`Name`] to the kind of object it names.
pub trait NameKind: 'static {
	/// Label used in errors and `Debug` output.
	const LABEL: &'static str;
}

macro_rules! name_kind {
	($marker:ident, $alias:ident, $label:literal, $doc:literal) => {
		#[doc = concat!("Kind marker for [`", stringify!($alias), "`].")]
		#[derive(Debug)]
		pub enum $marker {}
		impl NameKind for $marker {
			const LABEL: &'static str = $label;
		}

		#[doc = $doc]
		pub type $alias = Name<$marker>;
	};
}

name_kind! {
	RecordKind,
	RecordName,
	"Record",
	"Name of the storage record (Secret) that holds the token."
}
name_kind! {
	IdentityKind,
	IdentityName,
	"Identity",
	"Name of the service identity (ServiceAccount) the token is issued for."
}
name_kind! {
	NamespaceKind,
	Namespace,
	"Namespace",
	"Namespace scoping both the record and the identity."
}
name_kind! { AudienceKind, Audience, "Audience", "Intended recipient of the issued token." }

/// Reason a candidate name was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum NameError {
	/// Nothing was provided.
	#[error("{kind} name cannot be empty.")]
	Empty {
		/// Kind label of the rejected name.
		kind: &'static str,
	},
	/// Whitespace appeared anywhere in the value.
	#[error("{kind} name contains whitespace.")]
	Whitespace {
		/// Kind label of the rejected name.
		kind: &'static str,
	},
	/// The value exceeded [`NAME_MAX_LEN`].
	#[error("{kind} name exceeds {max} bytes.")]
	TooLong {
		/// Kind label of the rejected name.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

/// Validated name of a `K` object.
pub struct Name<K> {
	value: String,
	kind: PhantomData<fn() -> K>,
}
impl<K> Name<K>
where
	K: NameKind,
{
	/// Validates `value` and wraps it.
	pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
		let value = value.into();

		check::<K>(&value)?;

		Ok(Self::wrap(value))
	}

	/// Wraps a compiled-in default that is known to be valid.
	pub(crate) fn from_static(value: &'static str) -> Self {
		Self::wrap(value.to_owned())
	}

	/// Returns the name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.value
	}

	fn wrap(value: String) -> Self {
		Self { value, kind: PhantomData }
	}
}
impl<K> Clone for Name<K> {
	fn clone(&self) -> Self {
		Self { value: self.value.clone(), kind: PhantomData }
	}
}
impl<K> PartialEq for Name<K> {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}
impl<K> Eq for Name<K> {}
impl<K> PartialOrd for Name<K> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl<K> Ord for Name<K> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.value.cmp(&other.value)
	}
}
impl<K> Hash for Name<K> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.value.hash(state);
	}
}
impl<K> Deref for Name<K> {
	type Target = str;

	fn deref(&self) -> &str {
		&self.value
	}
}
impl<K> AsRef<str> for Name<K> {
	fn as_ref(&self) -> &str {
		&self.value
	}
}
impl<K> Borrow<str> for Name<K> {
	fn borrow(&self) -> &str {
		&self.value
	}
}
impl<K> Debug for Name<K>
where
	K: NameKind,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}({})", K::LABEL, self.value)
	}
}
impl<K> Display for Name<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}
impl<K> FromStr for Name<K>
where
	K: NameKind,
{
	type Err = NameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl<K> TryFrom<String> for Name<K>
where
	K: NameKind,
{
	type Error = NameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl<K> From<Name<K>> for String {
	fn from(name: Name<K>) -> Self {
		name.value
	}
}
impl<K> Serialize for Name<K> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.value)
	}
}
impl<'de, K> Deserialize<'de> for Name<K>
where
	K: NameKind,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Self::new(String::deserialize(deserializer)?).map_err(D::Error::custom)
	}
}

fn check<K>(value: &str) -> Result<(), NameError>
where
	K: NameKind,
{
	let kind = K::LABEL;

	if value.is_empty() {
		Err(NameError::Empty { kind })
	} else if value.chars().any(char::is_whitespace) {
		Err(NameError::Whitespace { kind })
	} else if value.len() > NAME_MAX_LEN {
		Err(NameError::TooLong { kind, max: NAME_MAX_LEN })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn whitespace_and_empty_values_are_rejected() {
		assert_eq!(
			RecordName::new(" gateway-sa-secret").expect_err("Leading whitespace is invalid."),
			NameError::Whitespace { kind: "Record" }
		);
		assert!(RecordName::new("gateway-sa-secret\n").is_err());
		assert_eq!(
			Namespace::new("").expect_err("Empty namespaces are invalid."),
			NameError::Empty { kind: "Namespace" }
		);
		assert_eq!(
			Audience::new("https://mesh.example/token").map(String::from),
			Ok("https://mesh.example/token".to_owned())
		);
	}

	#[test]
	fn length_is_capped_at_the_object_name_limit() {
		RecordName::new("a".repeat(NAME_MAX_LEN)).expect("The limit itself is allowed.");

		assert_eq!(
			IdentityName::new("a".repeat(NAME_MAX_LEN + 1)),
			Err(NameError::TooLong { kind: "Identity", max: NAME_MAX_LEN })
		);
	}

	#[test]
	fn deserialization_validates() {
		let identity: IdentityName = serde_json::from_str("\"higress-gateway\"")
			.expect("Valid identities should deserialize.");

		assert_eq!(identity.as_str(), "higress-gateway");
		assert_eq!(serde_json::to_string(&identity).ok().as_deref(), Some("\"higress-gateway\""));
		assert!(serde_json::from_str::<IdentityName>("\"with space\"").is_err());
		assert!(serde_json::from_str::<IdentityName>("\"\"").is_err());
	}

	#[test]
	fn formatting_shows_kind_only_in_debug() {
		let namespace: Namespace =
			"higress-system".parse().expect("Namespace fixture should be valid.");

		assert_eq!(format!("{namespace:?}"), "Namespace(higress-system)");
		assert_eq!(namespace.to_string(), "higress-system");
	}
}
