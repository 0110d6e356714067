//! Bound token issuance.
//!
//! Failures are never retried here: a signing failure usually means a missing identity or
//! missing permissions, and the operator has to see it.

// self
use crate::{
	_prelude::*,
	auth::{RecordName, TokenRequest, TokenSecret},
	flows::Provisioner,
	issuer::TokenIssuer,
	obs::{self, Stage},
	record::RecordKey,
};

impl Provisioner {
	/// Requests a token for the configured identity, bound to the record `record_name`.
	///
	/// The returned token has surrounding whitespace removed.
	pub async fn issue_token(&self, record_name: &RecordName) -> Result<TokenSecret> {
		let key = RecordKey::new(self.config.namespace.clone(), record_name.clone());

		obs::observe(Stage::IssueToken, &key, async {
			let request = TokenRequest::bound_to_record(
				self.config.audience.clone(),
				self.config.ttl,
				record_name.clone(),
			);
			let token = <dyn TokenIssuer>::create_token(
				self.issuer.as_ref(),
				&self.config.identity_name,
				&self.config.namespace,
				&request,
			)
			.await?
			.trim();

			tracing::info!(
				identity = %self.config.identity_name,
				audience = %self.config.audience,
				expiration_seconds = request.expiration_seconds,
				"Token created."
			);

			if token.is_empty() {
				tracing::warn!(identity = %self.config.identity_name, "Issued token is empty.");
			}

			Ok(token)
		})
		.await
	}
}
