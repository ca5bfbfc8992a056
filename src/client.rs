use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::options::parse_header;
use crate::state::generate_state;
use crate::{
    AccessToken, AuthorizationRequest, Grant, Newsletter2GoProvider, OAuthError, OAuthProvider,
    ProviderOptions, RequestOptions, ResourceOwner, TokenParams, TokenRef,
};

const CLIENT_ID_OPTION: &str = "clientId";
const CLIENT_SECRET_OPTION: &str = "clientSecret";
const REDIRECT_URI_OPTION: &str = "redirectUri";
const STATE_OPTION: &str = "state";
const TIMEOUT_OPTION: &str = "timeout";

#[derive(Debug, Clone, Default)]
pub struct OAuthClientConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub token_params: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl OAuthClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from string options. Unknown keys are rejected.
    pub fn from_options(options: ProviderOptions) -> Result<Self, OAuthError> {
        let mut config = Self::new();
        for (key, value) in options {
            match key.as_str() {
                CLIENT_ID_OPTION => config.client_id = Some(value),
                CLIENT_SECRET_OPTION => config.client_secret = Some(value),
                REDIRECT_URI_OPTION => config.redirect_uri = Some(value),
                STATE_OPTION => config.state = Some(value),
                TIMEOUT_OPTION => {
                    let seconds = value.parse::<u64>().map_err(|_| {
                        OAuthError::configuration(format!(
                            "option {TIMEOUT_OPTION} must be a whole number of seconds, got {value:?}"
                        ))
                    })?;
                    config.timeout = Some(Duration::from_secs(seconds));
                }
                _ => {
                    return Err(OAuthError::configuration(format!(
                        "unknown option: {key}"
                    )));
                }
            }
        }
        Ok(config)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// State used by [`OAuthClient::authorization_url`] when none is passed.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClient<P: OAuthProvider> {
    provider: P,
    config: OAuthClientConfig,
    http: Client,
}

impl OAuthClient<Newsletter2GoProvider> {
    /// Builds a Newsletter2Go client from a single option mapping. `authKey`
    /// goes to the provider, everything else to [`OAuthClientConfig`].
    pub fn from_options(options: ProviderOptions, http: Option<Client>) -> Result<Self, OAuthError> {
        let (provider, rest) = Newsletter2GoProvider::from_options(options)?;
        let config = OAuthClientConfig::from_options(rest)?;
        match http {
            Some(http) => Ok(Self::with_http_client(provider, config, http)),
            None => Self::new(provider, config),
        }
    }
}

impl<P: OAuthProvider> OAuthClient<P> {
    pub fn new(provider: P, config: OAuthClientConfig) -> Result<Self, OAuthError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            provider,
            config,
            http,
        })
    }

    pub fn with_http_client(provider: P, config: OAuthClientConfig, http: Client) -> Self {
        Self {
            provider,
            config,
            http,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    pub fn authorization_url(&self, state: Option<String>) -> Result<AuthorizationRequest, OAuthError> {
        let mut url = Url::parse(&self.provider.base_authorization_url()?)?;
        let state = match state.or_else(|| self.config.state.clone()) {
            Some(state) => state,
            None => generate_state()?,
        };
        let scope = self
            .provider
            .default_scopes()
            .join(self.provider.scope_separator());

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            if let Some(client_id) = &self.config.client_id {
                pairs.append_pair("client_id", client_id);
            }
            if let Some(redirect_uri) = &self.config.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }
            pairs.append_pair("state", &state);
            if !scope.is_empty() {
                pairs.append_pair("scope", &scope);
            }
        }

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            scope,
        })
    }

    /// Runs a token exchange for `grant`. The provider may rename the grant
    /// first; required parameters are checked against the built-in grant it
    /// resolves to. Caller params override the config defaults of the same name.
    pub async fn get_access_token(
        &self,
        grant: impl Into<Grant>,
        params: TokenParams,
    ) -> Result<AccessToken, OAuthError> {
        let prepared = self.provider.prepare_grant(grant.into(), params);
        let checked = prepared.checked_grant();
        for parameter in checked.required_params().iter().copied() {
            if !prepared.params.contains_key(parameter) {
                return Err(OAuthError::MissingGrantParameter {
                    grant: checked.to_string(),
                    parameter,
                });
            }
        }

        let grant = prepared.grant;
        let mut params = prepared.params;

        for (key, value) in &self.config.token_params {
            params
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        let url = self.provider.base_access_token_url(&params);

        let mut body = Vec::new();
        if let Some(client_id) = &self.config.client_id {
            body.push(("client_id".to_string(), client_id.clone()));
        }
        if let Some(secret) = &self.config.client_secret {
            body.push(("client_secret".to_string(), secret.clone()));
        }
        if let Some(redirect_uri) = &self.config.redirect_uri {
            body.push(("redirect_uri".to_string(), redirect_uri.clone()));
        }
        body.push(("grant_type".to_string(), grant.to_string()));
        for (key, value) in params {
            set_param(&mut body, key, value);
        }

        let options = self
            .provider
            .access_token_request_options(RequestOptions::form(body))?;

        debug!(
            provider = self.provider.id(),
            grant = %grant,
            url = %url,
            "requesting access token"
        );

        let response = self
            .http
            .request(options.method, &url)
            .headers(options.headers)
            .form(&options.body)
            .send()
            .await?;

        let body = self.parse_response(response).await?;
        AccessToken::from_json(body)
    }

    pub async fn refresh_access_token(&self, token: &AccessToken) -> Result<AccessToken, OAuthError> {
        let refresh_token = token
            .refresh_token()
            .ok_or(OAuthError::MissingRefreshToken)?;
        let params = TokenParams::from([("refresh_token".to_string(), refresh_token.to_string())]);
        self.get_access_token(Grant::RefreshToken, params).await
    }

    pub async fn get_resource_owner(&self, token: &AccessToken) -> Result<ResourceOwner, OAuthError> {
        let url = self.provider.resource_owner_details_url(token)?;

        debug!(
            provider = self.provider.id(),
            url = %url,
            "requesting resource owner details"
        );

        let response = self
            .authenticated_request(Method::GET, &url, TokenRef::Token(token))?
            .send()
            .await?;

        let body = self.parse_response(response).await?;
        self.provider.create_resource_owner(body, token)
    }

    /// A request to `url` carrying the provider's authorization headers for `token`.
    pub fn authenticated_request(
        &self,
        method: Method,
        url: &str,
        token: TokenRef<'_>,
    ) -> Result<RequestBuilder, OAuthError> {
        let headers = self.provider.authorization_headers(Some(token));
        apply_headers(self.http.request(method, url), &headers)
    }

    async fn parse_response(&self, response: Response) -> Result<Value, OAuthError> {
        let status = response.status();
        let body = response.text().await?;

        debug!(
            provider = self.provider.id(),
            status = status.as_u16(),
            "received response"
        );

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(err) if status.is_success() => {
                return Err(OAuthError::InvalidResponse {
                    message: err.to_string(),
                    body,
                });
            }
            Err(_) => return Err(http_status(status, body)),
        };

        self.provider.check_response(status, &parsed)?;

        if !status.is_success() {
            return Err(http_status(status, body));
        }
        Ok(parsed)
    }
}

fn set_param(params: &mut Vec<(String, String)>, key: String, value: String) {
    if let Some((_, existing)) = params.iter_mut().find(|(param, _)| *param == key) {
        *existing = value;
    } else {
        params.push((key, value));
    }
}

fn http_status(status: StatusCode, body: String) -> OAuthError {
    OAuthError::HttpStatus {
        status: status.as_u16(),
        body,
    }
}

fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(String, String)],
) -> Result<RequestBuilder, OAuthError> {
    for (name, value) in headers {
        let (name, value) = parse_header(name, value)?;
        builder = builder.header(name, value);
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const AUTHORIZE_URL: &str = "https://auth.example.com/authorize";

    struct ExampleProvider;

    impl OAuthProvider for ExampleProvider {
        fn id(&self) -> &'static str {
            "example"
        }

        fn base_authorization_url(&self) -> Result<String, OAuthError> {
            Ok(AUTHORIZE_URL.to_string())
        }

        fn base_access_token_url(&self, _params: &TokenParams) -> String {
            "https://auth.example.com/token".to_string()
        }

        fn resource_owner_details_url(&self, _token: &AccessToken) -> Result<String, OAuthError> {
            Ok("https://auth.example.com/me".to_string())
        }

        fn default_scopes(&self) -> Vec<String> {
            vec!["profile".to_string(), "email".to_string()]
        }

        fn check_response(&self, _status: StatusCode, _body: &Value) -> Result<(), OAuthError> {
            Ok(())
        }

        fn create_resource_owner(
            &self,
            response: Value,
            _token: &AccessToken,
        ) -> Result<ResourceOwner, OAuthError> {
            let data = response.as_object().cloned().unwrap_or_default();
            Ok(ResourceOwner::new(data, "sub"))
        }
    }

    #[test]
    fn authorization_url_includes_required_params() {
        let config = OAuthClientConfig::new()
            .with_client_id("client-id")
            .with_redirect_uri("http://localhost:8765/callback");
        let client = OAuthClient::new(ExampleProvider, config).unwrap();
        let auth = client.authorization_url(None).unwrap();

        let url = Url::parse(&auth.authorization_url).unwrap();
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(auth.authorization_url.starts_with(AUTHORIZE_URL));
        assert_eq!(pairs.get("response_type"), Some(&"code".to_string()));
        assert_eq!(pairs.get("client_id"), Some(&"client-id".to_string()));
        assert_eq!(
            pairs.get("redirect_uri"),
            Some(&"http://localhost:8765/callback".to_string())
        );
        assert_eq!(pairs.get("scope"), Some(&"profile email".to_string()));
        assert_eq!(pairs.get("state"), Some(&auth.state));
    }

    #[test]
    fn authorization_url_keeps_explicit_state() {
        let client = OAuthClient::new(ExampleProvider, OAuthClientConfig::new()).unwrap();
        let auth = client.authorization_url(Some("fixed".to_string())).unwrap();
        assert_eq!(auth.state, "fixed");
    }

    #[test]
    fn authorization_url_surfaces_unsupported_provider() {
        let provider = Newsletter2GoProvider::new("key").unwrap();
        let client = OAuthClient::new(provider, OAuthClientConfig::new()).unwrap();
        assert!(matches!(
            client.authorization_url(None),
            Err(OAuthError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn config_from_options_reads_known_keys() {
        let options = ProviderOptions::from([
            ("clientId".to_string(), "abc".to_string()),
            ("clientSecret".to_string(), "secret".to_string()),
            ("redirectUri".to_string(), "http://localhost/cb".to_string()),
            ("timeout".to_string(), "30".to_string()),
        ]);
        let config = OAuthClientConfig::from_options(options).unwrap();

        assert_eq!(config.client_id.as_deref(), Some("abc"));
        assert_eq!(config.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.redirect_uri.as_deref(), Some("http://localhost/cb"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn client_from_options_accepts_state() {
        let options = ProviderOptions::from([
            ("authKey".to_string(), "key".to_string()),
            ("state".to_string(), "from-config".to_string()),
        ]);
        let client = OAuthClient::from_options(options, None).unwrap();
        assert_eq!(client.config().state.as_deref(), Some("from-config"));
    }

    #[test]
    fn authorization_url_falls_back_to_configured_state() {
        let config = OAuthClientConfig::new().with_state("from-config");
        let client = OAuthClient::new(ExampleProvider, config).unwrap();
        let auth = client.authorization_url(None).unwrap();
        assert_eq!(auth.state, "from-config");

        let auth = client.authorization_url(Some("explicit".to_string())).unwrap();
        assert_eq!(auth.state, "explicit");
    }

    #[test]
    fn set_param_replaces_existing_keys() {
        let mut params = vec![
            ("client_id".to_string(), "cfg".to_string()),
            ("grant_type".to_string(), "password".to_string()),
        ];
        set_param(&mut params, "client_id".to_string(), "override".to_string());
        set_param(&mut params, "username".to_string(), "u".to_string());

        assert_eq!(
            params,
            vec![
                ("client_id".to_string(), "override".to_string()),
                ("grant_type".to_string(), "password".to_string()),
                ("username".to_string(), "u".to_string()),
            ]
        );
    }

    #[test]
    fn config_from_options_rejects_unknown_keys() {
        let options = ProviderOptions::from([("scopes".to_string(), "x".to_string())]);
        assert!(matches!(
            OAuthClientConfig::from_options(options),
            Err(OAuthError::Configuration { .. })
        ));
    }

    #[test]
    fn config_from_options_rejects_bad_timeout() {
        let options = ProviderOptions::from([("timeout".to_string(), "soon".to_string())]);
        assert!(matches!(
            OAuthClientConfig::from_options(options),
            Err(OAuthError::Configuration { .. })
        ));
    }

    #[test]
    fn client_from_options_requires_auth_key() {
        let options = ProviderOptions::from([("clientId".to_string(), "abc".to_string())]);
        assert!(matches!(
            OAuthClient::from_options(options, None),
            Err(OAuthError::Configuration { .. })
        ));
    }

    #[test]
    fn authenticated_request_carries_bearer_token() {
        let provider = Newsletter2GoProvider::new("key").unwrap();
        let client = OAuthClient::new(provider, OAuthClientConfig::new()).unwrap();
        let token = AccessToken::new("abc");

        let request = client
            .authenticated_request(Method::GET, "https://example.com/x", TokenRef::from(&token))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.headers()["authorization"], "Bearer abc");
    }
}
