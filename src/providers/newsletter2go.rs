use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{StatusCode, header::HeaderMap};
use serde_json::Value;
use url::form_urlencoded;

use crate::options::{assert_required_options, parse_header, split_options};
use crate::{
    AccessToken, Grant, OAuthError, OAuthProvider, PreparedGrant, ProviderOptions,
    RequestOptions, ResourceOwner, TokenParams, TokenRef,
};

const ENDPOINT: &str = "https://api.newsletter2go.com";
const TOKEN_PATH: &str = "/oauth/v2/token";

const ACCOUNT_ID_CLAIM: &str = "account_id";
const RESOURCE_OWNER_ID_KEY: &str = "id";

const AUTH_KEY_OPTION: &str = "authKey";
const REQUIRED_OPTIONS: &[&str] = &[AUTH_KEY_OPTION];
const OPTIONAL_OPTIONS: &[&str] = &[];

/// Generic grant names and the grant types Newsletter2Go expects in their place.
pub const GRANT_MAPPINGS: &[(&str, &str)] = &[
    ("password", "https://nl2go.com/jwt"),
    ("refresh_token", "https://nl2go.com/jwt_refresh"),
];

#[derive(Debug, Clone)]
pub struct Newsletter2GoProvider {
    auth_key: String,
    endpoint: String,
}

impl Newsletter2GoProvider {
    pub fn new(auth_key: impl Into<String>) -> Result<Self, OAuthError> {
        let auth_key = auth_key.into();
        if auth_key.is_empty() {
            return Err(OAuthError::configuration(format!(
                "required options missing or empty: {AUTH_KEY_OPTION}"
            )));
        }
        Ok(Self {
            auth_key,
            endpoint: ENDPOINT.to_string(),
        })
    }

    /// Consumes the options this provider recognizes and returns the rest
    /// untouched, ready for [`crate::OAuthClientConfig::from_options`].
    pub fn from_options(options: ProviderOptions) -> Result<(Self, ProviderOptions), OAuthError> {
        assert_required_options(&options, REQUIRED_OPTIONS)?;

        let configurable: Vec<&str> = Self::configurable_options().collect();
        let (mut configured, rest) = split_options(options, &configurable);
        let auth_key = configured.remove(AUTH_KEY_OPTION).unwrap_or_default();

        Ok((Self::new(auth_key)?, rest))
    }

    pub fn configurable_options() -> impl Iterator<Item = &'static str> {
        REQUIRED_OPTIONS.iter().chain(OPTIONAL_OPTIONS).copied()
    }

    /// Points the provider at another API base, e.g. a staging host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn auth_key(&self) -> &str {
        &self.auth_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl OAuthProvider for Newsletter2GoProvider {
    fn id(&self) -> &'static str {
        "newsletter2go"
    }

    fn base_authorization_url(&self) -> Result<String, OAuthError> {
        Err(OAuthError::UnsupportedOperation {
            operation: "authorization url",
        })
    }

    fn base_access_token_url(&self, _params: &TokenParams) -> String {
        format!("{}{TOKEN_PATH}", self.endpoint)
    }

    fn resource_owner_details_url(&self, token: &AccessToken) -> Result<String, OAuthError> {
        let account_id = match token.value(ACCOUNT_ID_CLAIM) {
            Some(Value::String(account_id)) => account_id.clone(),
            Some(Value::Number(account_id)) => account_id.to_string(),
            _ => {
                return Err(OAuthError::MissingClaim {
                    claim: ACCOUNT_ID_CLAIM,
                });
            }
        };

        let filter = format!("{ACCOUNT_ID_CLAIM}==\"{account_id}\"");
        // urlencode-compatible: `*` is escaped as well.
        let filter = form_urlencoded::byte_serialize(filter.as_bytes())
            .collect::<String>()
            .replace('*', "%2A");
        Ok(format!("{}/users?_filter={filter}&_expand=true", self.endpoint))
    }

    fn default_scopes(&self) -> Vec<String> {
        Vec::new()
    }

    fn access_token_request_options(
        &self,
        options: RequestOptions,
    ) -> Result<RequestOptions, OAuthError> {
        let credentials = STANDARD.encode(self.auth_key.as_bytes());
        let (name, value) = parse_header("Authorization", &format!("Basic {credentials}"))?;
        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        Ok(options.merge_headers(headers))
    }

    fn prepare_grant(&self, grant: Grant, mut params: TokenParams) -> PreparedGrant {
        let mapping = GRANT_MAPPINGS
            .iter()
            .find(|(generic, vendor)| grant.as_str() == *generic || grant.as_str() == *vendor);

        match mapping {
            Some((generic, vendor)) => {
                // The vendor grant type is mandatory on the wire.
                params.remove("grant_type");
                PreparedGrant {
                    grant: Grant::Custom((*vendor).to_string()),
                    generic: Some(Grant::from(*generic)),
                    params,
                }
            }
            None => PreparedGrant::unchanged(grant, params),
        }
    }

    fn check_response(&self, status: StatusCode, body: &Value) -> Result<(), OAuthError> {
        let Some(error) = body.get("error").filter(|error| !is_blank(error)) else {
            return Ok(());
        };

        let mut message = match error {
            Value::String(error) => error.clone(),
            other => other.to_string(),
        };
        if let Some(description) = body.get("error_description").and_then(Value::as_str) {
            message = format!("{message}: {description}");
        }

        Err(OAuthError::IdentityProvider {
            message,
            status: status.as_u16(),
            body: body.clone(),
        })
    }

    fn create_resource_owner(
        &self,
        response: Value,
        _token: &AccessToken,
    ) -> Result<ResourceOwner, OAuthError> {
        let entries = match response {
            Value::Object(mut response) => response.remove("value"),
            _ => None,
        };
        let first = match entries {
            Some(Value::Array(entries)) => entries.into_iter().next(),
            _ => None,
        };

        match first {
            Some(Value::Object(data)) => Ok(ResourceOwner::new(data, RESOURCE_OWNER_ID_KEY)),
            _ => Err(OAuthError::EmptyResourceList),
        }
    }

    fn authorization_headers(&self, token: Option<TokenRef<'_>>) -> Vec<(String, String)> {
        token
            .map(|token| {
                vec![(
                    "Authorization".to_string(),
                    format!("Bearer {}", token.as_str()),
                )]
            })
            .unwrap_or_default()
    }
}

/// Values a provider may send in `error` that still mean "no error".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
