//! Token values returned by the identity provider.

pub mod record;
pub mod secret;
