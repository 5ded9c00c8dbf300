//! Provider-facing configuration (data) and error classification (behavior).
//!
//! `descriptor` holds the single, collapsed provider configuration: authorize, token, and
//! userinfo endpoints, the requested scopes, and the client authentication method.
//! `strategy` defines [`ProviderStrategy`], the hook used to classify token endpoint
//! failures into [`ProviderErrorKind`] values carried by exchange errors.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
