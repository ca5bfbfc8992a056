use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("{operation} is not supported by this provider")]
    UnsupportedOperation { operation: &'static str },

    #[error("identity provider error (status {status}): {message}")]
    IdentityProvider {
        message: String,
        status: u16,
        body: serde_json::Value,
    },

    #[error("access token is missing the `{claim}` claim")]
    MissingClaim { claim: &'static str },

    #[error("resource owner response contains no entries")]
    EmptyResourceList,

    #[error("grant `{grant}` requires the `{parameter}` parameter")]
    MissingGrantParameter {
        grant: String,
        parameter: &'static str,
    },

    #[error("access token has no refresh token")]
    MissingRefreshToken,

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },
}

impl OAuthError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
