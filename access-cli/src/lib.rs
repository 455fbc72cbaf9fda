//! Device-authorization-grant login for short-lived cloud credentials.
//!
//! The CLI registers itself with the identity provider, walks the operator
//! through a browser-mediated login, polls for completion, exchanges the
//! access token for role credentials, and caches those locally with
//! owner-only permissions.

pub mod cache;
pub mod config;
pub mod error;
pub mod flow;
pub mod provider;

pub use cache::{CachedCredentials, CredentialCache};
pub use config::{ConfigStore, SsoConfig};
pub use error::CliError;
pub use flow::LoginFlow;
pub use provider::{IdentityProvider, RoleCredentials, SsoOidc};
