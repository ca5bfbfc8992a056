//! OAuth 2.0 client for the Newsletter2Go API.
//!
//! [`OAuthClient`] runs the generic token and resource-owner flows and defers
//! every vendor-specific decision to an [`OAuthProvider`]. The bundled
//! [`Newsletter2GoProvider`] authenticates token requests with the account's
//! auth key, renames the password and refresh grants to Newsletter2Go's own
//! grant types and looks users up by the token's `account_id`.

mod client;
mod error;
mod grant;
mod options;
mod providers;
mod state;
mod types;

pub use client::{OAuthClient, OAuthClientConfig};
pub use error::OAuthError;
pub use grant::{Grant, PreparedGrant};
pub use options::{ProviderOptions, RequestOptions, TokenParams};
pub use providers::{GRANT_MAPPINGS, Newsletter2GoProvider, OAuthProvider};
pub use state::generate_state;
pub use types::{AccessToken, AuthorizationRequest, ResourceOwner, TokenRef, TokenResponse};
