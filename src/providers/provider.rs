use reqwest::StatusCode;
use serde_json::Value;

use crate::{
    AccessToken, Grant, OAuthError, PreparedGrant, RequestOptions, ResourceOwner, TokenParams,
    TokenRef,
};

/// Vendor policy plugged into [`crate::OAuthClient`].
///
/// The client drives the standard flow and calls into these hooks wherever a
/// provider needs its own URLs, headers, grant names or response handling.
pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Base URL of the browser authorization step.
    fn base_authorization_url(&self) -> Result<String, OAuthError>;

    fn base_access_token_url(&self, params: &TokenParams) -> String;

    fn resource_owner_details_url(&self, token: &AccessToken) -> Result<String, OAuthError>;

    fn default_scopes(&self) -> Vec<String>;

    fn scope_separator(&self) -> &'static str {
        " "
    }

    /// Options for the token request; `options` already carries the form body.
    fn access_token_request_options(
        &self,
        options: RequestOptions,
    ) -> Result<RequestOptions, OAuthError> {
        Ok(options)
    }

    /// Rewrites the grant before the exchange.
    fn prepare_grant(&self, grant: Grant, params: TokenParams) -> PreparedGrant {
        PreparedGrant::unchanged(grant, params)
    }

    fn check_response(&self, status: StatusCode, body: &Value) -> Result<(), OAuthError>;

    fn create_resource_owner(
        &self,
        response: Value,
        token: &AccessToken,
    ) -> Result<ResourceOwner, OAuthError>;

    fn authorization_headers(&self, _token: Option<TokenRef<'_>>) -> Vec<(String, String)> {
        Vec::new()
    }
}
