//! Environment-driven provisioner configuration.
//!
//! Five parameters are resolved once per run. Each one has a fixed environment variable and a
//! compiled-in default; overrides that are missing or unusable fall back to the default and
//! never abort the run. The resolved [`ProvisionerConfig`] is immutable and passed explicitly
//! to every stage.
//!
//! | Variable | Parameter | Default |
//! |---|---|---|
//! | `SECRET_NAME_FOR_GW_TOKEN` | record name | `gateway-sa-secret` |
//! | `SERVICE_ACCOUNT_NAME` | identity name | `higress-gateway` |
//! | `NAMESPACE` | namespace | `higress-system` |
//! | `TOKEN_AUDIENCE` | audience | `istio-ca` |
//! | `TOKEN_EXPIRATION_SECONDS` | token TTL (`90s`, `48h`, `30d`, `1h30m`) | 365 days |

// std
use std::ffi::OsString;
// crates.io
use duration_string::DurationString;
// self
use crate::{
	_prelude::*,
	auth::{Audience, IdentityName, NameError, Namespace, RecordName},
};

/// Environment variable overriding the record name.
pub const RECORD_NAME_VAR: &str = "SECRET_NAME_FOR_GW_TOKEN";
/// Environment variable overriding the identity name.
pub const IDENTITY_NAME_VAR: &str = "SERVICE_ACCOUNT_NAME";
/// Environment variable overriding the namespace.
pub const NAMESPACE_VAR: &str = "NAMESPACE";
/// Environment variable overriding the token audience.
pub const AUDIENCE_VAR: &str = "TOKEN_AUDIENCE";
/// Environment variable overriding the token TTL.
pub const TTL_VAR: &str = "TOKEN_EXPIRATION_SECONDS";

/// Default record name.
pub const DEFAULT_RECORD_NAME: &str = "gateway-sa-secret";
/// Default identity name.
pub const DEFAULT_IDENTITY_NAME: &str = "higress-gateway";
/// Default namespace.
pub const DEFAULT_NAMESPACE: &str = "higress-system";
/// Default token audience.
pub const DEFAULT_AUDIENCE: &str = "istio-ca";
/// Default token TTL (365 days).
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(31_536_000);

/// Immutable configuration snapshot shared by every provisioning stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionerConfig {
	/// Name of the record that stores the token.
	pub record_name: RecordName,
	/// Identity the token is issued for.
	pub identity_name: IdentityName,
	/// Namespace scoping the record and the identity.
	pub namespace: Namespace,
	/// Intended recipient of the token.
	pub audience: Audience,
	/// Requested token lifetime.
	pub ttl: StdDuration,
}
impl ProvisionerConfig {
	/// Resolves the configuration from the process environment.
	pub fn from_env() -> Self {
		Self::resolve(|name| std::env::var_os(name)).config
	}

	/// Resolves the configuration through `lookup`, which maps a variable name to its raw value.
	///
	/// Every effective value is logged; rejected overrides are logged as warnings and returned
	/// alongside the configuration.
	pub fn resolve<F>(lookup: F) -> Resolution
	where
		F: Fn(&str) -> Option<OsString>,
	{
		let mut warnings = Vec::new();
		let defaults = Self::default();
		let record_name =
			resolve_name(&lookup, RECORD_NAME_VAR, defaults.record_name, &mut warnings);
		let identity_name =
			resolve_name(&lookup, IDENTITY_NAME_VAR, defaults.identity_name, &mut warnings);
		let namespace = resolve_name(&lookup, NAMESPACE_VAR, defaults.namespace, &mut warnings);
		let audience = resolve_name(&lookup, AUDIENCE_VAR, defaults.audience, &mut warnings);
		let ttl = resolve_ttl(&lookup, defaults.ttl, &mut warnings);

		Resolution {
			config: Self { record_name, identity_name, namespace, audience, ttl },
			warnings,
		}
	}
}
impl Default for ProvisionerConfig {
	fn default() -> Self {
		Self {
			record_name: RecordName::from_static(DEFAULT_RECORD_NAME),
			identity_name: IdentityName::from_static(DEFAULT_IDENTITY_NAME),
			namespace: Namespace::from_static(DEFAULT_NAMESPACE),
			audience: Audience::from_static(DEFAULT_AUDIENCE),
			ttl: DEFAULT_TTL,
		}
	}
}

/// Outcome of [`ProvisionerConfig::resolve`].
#[derive(Clone, Debug)]
pub struct Resolution {
	/// Effective configuration.
	pub config: ProvisionerConfig,
	/// Overrides that were rejected in favor of the default.
	pub warnings: Vec<ConfigWarning>,
}

/// Override rejected during resolution.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigWarning {
	/// A name override failed validation.
	#[error("{var} value `{value}` is invalid ({error}); using the default.")]
	InvalidName {
		/// Variable that carried the override.
		var: &'static str,
		/// Rejected value.
		value: String,
		/// Validation failure.
		error: NameError,
	},
	/// An override was set but is not valid UTF-8.
	#[error("{var} value `{value}` is not valid UTF-8; using the default.")]
	NotUnicode {
		/// Variable that carried the override.
		var: &'static str,
		/// Lossy rendering of the rejected value.
		value: String,
	},
	/// The TTL override could not be parsed as a positive duration.
	#[error("{var} value `{value}` is not a valid duration ({reason}); using the default.")]
	InvalidDuration {
		/// Variable that carried the override.
		var: &'static str,
		/// Rejected value.
		value: String,
		/// Parser failure.
		reason: String,
	},
}

enum Override {
	Unset,
	Unreadable,
	Set(String),
}

fn read_override<F>(lookup: &F, var: &'static str, warnings: &mut Vec<ConfigWarning>) -> Override
where
	F: Fn(&str) -> Option<OsString>,
{
	match lookup(var).map(OsString::into_string) {
		None => Override::Unset,
		Some(Ok(value)) => Override::Set(value),
		Some(Err(raw)) => {
			let warning =
				ConfigWarning::NotUnicode { var, value: raw.to_string_lossy().into_owned() };

			tracing::warn!(var, "{warning}");
			warnings.push(warning);

			Override::Unreadable
		},
	}
}

fn resolve_name<F, T>(
	lookup: &F,
	var: &'static str,
	default: T,
	warnings: &mut Vec<ConfigWarning>,
) -> T
where
	F: Fn(&str) -> Option<OsString>,
	T: FromStr<Err = NameError> + Display,
{
	let value = match read_override(lookup, var, warnings) {
		Override::Set(value) => value,
		Override::Unset => {
			tracing::info!(var, value = %default, "Variable not set, using the default.");

			return default;
		},
		Override::Unreadable => return default,
	};

	match value.parse::<T>() {
		Ok(parsed) => {
			tracing::info!(var, value = %parsed, "Using the configured value.");

			parsed
		},
		Err(error) => {
			let warning = ConfigWarning::InvalidName { var, value, error };

			tracing::warn!(var, value = %default, "{warning}");
			warnings.push(warning);

			default
		},
	}
}

fn resolve_ttl<F>(
	lookup: &F,
	default: StdDuration,
	warnings: &mut Vec<ConfigWarning>,
) -> StdDuration
where
	F: Fn(&str) -> Option<OsString>,
{
	let value = match read_override(lookup, TTL_VAR, warnings) {
		Override::Set(value) => value,
		Override::Unset => {
			tracing::info!(var = TTL_VAR, value = ?default, "Variable not set, using the default.");

			return default;
		},
		Override::Unreadable => return default,
	};

	match parse_ttl(&value) {
		Ok(ttl) => {
			tracing::info!(var = TTL_VAR, value = ?ttl, "Using the configured value.");

			ttl
		},
		Err(reason) => {
			let warning = ConfigWarning::InvalidDuration { var: TTL_VAR, value, reason };

			tracing::warn!(var = TTL_VAR, value = ?default, "{warning}");
			warnings.push(warning);

			default
		},
	}
}

/// Parses a TTL expression such as `90s`, `48h`, `30d` or `1h30m`.
///
/// Every component needs a unit; bare numbers and fractional amounts are rejected.
pub fn parse_ttl(value: &str) -> Result<StdDuration, String> {
	let ttl = StdDuration::from(DurationString::from_string(value.trim().to_owned())?);

	if ttl.is_zero() {
		return Err("duration must be positive".into());
	}

	Ok(ttl)
}
