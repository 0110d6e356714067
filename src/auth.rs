//! Object names and the token models exchanged with the identity service.

pub mod name;
pub mod token;

pub use name::*;
pub use token::{request::*, secret::*};
