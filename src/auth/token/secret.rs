//! Issued token material.

// self
use crate::_prelude::*;

/// Token returned by the identity service.
///
/// Formatting never prints the value; only [`TokenSecret::expose`] and
/// [`TokenSecret::as_bytes`] give access to it.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(Box<str>);
impl TokenSecret {
	/// Wraps raw token material.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into().into_boxed_str())
	}

	/// Returns the token value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns the token bytes as written into a record payload.
	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}

	/// Returns `true` when no token material is present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Drops leading and trailing whitespace, reusing the allocation when there is none.
	pub fn trim(self) -> Self {
		if self.0.trim().len() == self.0.len() { self } else { Self(self.0.trim().into()) }
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSecret").field("len", &self.0.len()).finish_non_exhaustive()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
