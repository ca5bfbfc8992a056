use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::OAuthError;

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub state: String,
    pub scope: String,
}

/// Raw token endpoint payload. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub expires: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// An issued access token together with the extra values the provider sent
/// alongside it (Newsletter2Go puts `account_id` there).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    expires: Option<u64>,
    values: HashMap<String, Value>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: None,
            scope: None,
            expires: None,
            values: HashMap::new(),
        }
    }

    pub fn from_response(response: TokenResponse) -> Self {
        // `expires` is an absolute timestamp; `expires_in` wins when both are present.
        let expires = response
            .expires_in
            .map(|seconds| unix_now().saturating_add(seconds))
            .or(response.expires);

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            scope: response.scope,
            expires,
            values: response.extra,
        }
    }

    pub fn from_json(body: Value) -> Result<Self, OAuthError> {
        let response: TokenResponse =
            serde_json::from_value(body.clone()).map_err(|err| OAuthError::InvalidResponse {
                message: err.to_string(),
                body: body.to_string(),
            })?;
        Ok(Self::from_response(response))
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn expires(&self) -> Option<u64> {
        self.expires
    }

    /// `None` when the provider did not send an expiry.
    pub fn has_expired(&self) -> Option<bool> {
        self.expires.map(|expires| expires <= unix_now())
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// A token as accepted by [`crate::OAuthProvider::authorization_headers`].
#[derive(Debug, Clone, Copy)]
pub enum TokenRef<'a> {
    Token(&'a AccessToken),
    Raw(&'a str),
}

impl TokenRef<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            TokenRef::Token(token) => token.token(),
            TokenRef::Raw(raw) => raw,
        }
    }
}

impl<'a> From<&'a AccessToken> for TokenRef<'a> {
    fn from(token: &'a AccessToken) -> Self {
        TokenRef::Token(token)
    }
}

impl<'a> From<&'a str> for TokenRef<'a> {
    fn from(raw: &'a str) -> Self {
        TokenRef::Raw(raw)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResourceOwner {
    #[serde(skip)]
    id_key: String,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl ResourceOwner {
    pub fn new(data: Map<String, Value>, id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            data,
        }
    }

    pub fn id(&self) -> Option<&Value> {
        self.data.get(&self.id_key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_json_keeps_extra_values() {
        let token = AccessToken::from_json(json!({
            "access_token": "abc",
            "refresh_token": "def",
            "token_type": "bearer",
            "expires_in": 7200,
            "account_id": "acc-1"
        }))
        .unwrap();

        assert_eq!(token.token(), "abc");
        assert_eq!(token.refresh_token(), Some("def"));
        assert_eq!(token.value("account_id"), Some(&json!("acc-1")));
        assert_eq!(token.has_expired(), Some(false));
    }

    #[test]
    fn from_json_requires_access_token() {
        let result = AccessToken::from_json(json!({"token_type": "bearer"}));
        assert!(matches!(result, Err(OAuthError::InvalidResponse { .. })));
    }

    #[test]
    fn absolute_expiry_in_the_past_has_expired() {
        let token = AccessToken::new("abc").with_expires(1);
        assert_eq!(token.has_expired(), Some(true));
        assert_eq!(AccessToken::new("abc").has_expired(), None);
    }

    #[test]
    fn token_ref_resolves_both_forms() {
        let token = AccessToken::new("from-token");
        assert_eq!(TokenRef::from(&token).as_str(), "from-token");
        assert_eq!(TokenRef::from("raw").as_str(), "raw");
    }

    #[test]
    fn resource_owner_uses_configured_id_key() {
        let data = json!({"id": "42", "name": "x"})
            .as_object()
            .cloned()
            .unwrap();
        let owner = ResourceOwner::new(data, "id");
        assert_eq!(owner.id(), Some(&json!("42")));
        assert_eq!(owner.get("name"), Some(&json!("x")));
    }
}
