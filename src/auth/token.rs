//! Issued token secrets and the bound token request sent to the identity service.

pub mod request;
pub mod secret;
