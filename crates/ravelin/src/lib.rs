//! Ravelin security layer.
//!
//! Sits in front of a host framework's handlers:
//! - [`api_key`] rejects requests without the client API key
//! - [`public`] marks routes that skip authentication
//! - [`gate`] admits or rejects requests on bearer tokens and roles
//! - [`signature_guard`] checks HMAC request signatures
//!
//! The main entry point for operators is the `ravelin` binary.

pub mod api_key;
pub mod config;
pub mod error;
pub mod gate;
pub mod listing;
pub mod public;
pub mod response;
pub mod signature_guard;
pub mod token;

pub use api_key::{ApiKeyGuard, ClientSecret};
pub use config::{RavelinConfig, SecretScope};
pub use error::{ConfigError, Rejection};
pub use gate::{Admission, AuthContext, AuthPolicy, Gate, MatchedRoute};
pub use public::{PublicMarker, PublicRoutes, PublicSelector, RouteKey};
pub use response::RejectionBody;
pub use signature_guard::SignatureGuard;
pub use token::{Principal, TokenVerifier};
