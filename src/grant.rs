use std::fmt;

use crate::TokenParams;

/// Grant used for a token request. Built-in grants validate their required
/// parameters; `Custom` carries any other `grant_type` value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grant {
    AuthorizationCode,
    ClientCredentials,
    Password,
    RefreshToken,
    Custom(String),
}

impl Grant {
    pub fn as_str(&self) -> &str {
        match self {
            Grant::AuthorizationCode => "authorization_code",
            Grant::ClientCredentials => "client_credentials",
            Grant::Password => "password",
            Grant::RefreshToken => "refresh_token",
            Grant::Custom(name) => name,
        }
    }

    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Grant::AuthorizationCode => &["code"],
            Grant::ClientCredentials | Grant::Custom(_) => &[],
            Grant::Password => &["username", "password"],
            Grant::RefreshToken => &["refresh_token"],
        }
    }
}

/// A grant after the provider has had its say.
///
/// `grant` is sent as `grant_type`. `generic` names the built-in grant whose
/// required parameters apply when the provider renamed it; `None` means the
/// wire grant is checked as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedGrant {
    pub grant: Grant,
    pub generic: Option<Grant>,
    pub params: TokenParams,
}

impl PreparedGrant {
    pub fn unchanged(grant: Grant, params: TokenParams) -> Self {
        Self {
            grant,
            generic: None,
            params,
        }
    }

    /// The grant whose required parameters must be present.
    pub fn checked_grant(&self) -> &Grant {
        self.generic.as_ref().unwrap_or(&self.grant)
    }
}

impl From<&str> for Grant {
    fn from(value: &str) -> Self {
        match value {
            "authorization_code" => Grant::AuthorizationCode,
            "client_credentials" => Grant::ClientCredentials,
            "password" => Grant::Password,
            "refresh_token" => Grant::RefreshToken,
            other => Grant::Custom(other.to_string()),
        }
    }
}

impl From<String> for Grant {
    fn from(value: String) -> Self {
        Grant::from(value.as_str())
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Grant;

    #[test]
    fn parses_builtin_names() {
        assert_eq!(Grant::from("password"), Grant::Password);
        assert_eq!(Grant::from("refresh_token"), Grant::RefreshToken);
        assert_eq!(
            Grant::from("https://nl2go.com/jwt"),
            Grant::Custom("https://nl2go.com/jwt".to_string())
        );
    }

    #[test]
    fn custom_grants_keep_their_name() {
        let grant = Grant::Custom("urn:example:grant".to_string());
        assert_eq!(grant.to_string(), "urn:example:grant");
        assert!(grant.required_params().is_empty());
    }
}
