use std::collections::BTreeMap;

use reqwest::{
    Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};

use crate::OAuthError;

/// String configuration mapping as accepted by the `from_options` constructors.
pub type ProviderOptions = BTreeMap<String, String>;

/// Token request parameters, sent form-encoded.
pub type TokenParams = BTreeMap<String, String>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Everything the client needs to send a token request apart from its URL.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn form(body: Vec<(String, String)>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        Self {
            method: Method::POST,
            headers,
            body,
        }
    }

    /// Appends a header. An existing header of the same name keeps its value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, OAuthError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Merges `headers` into these options without replacing any existing value.
    pub fn merge_headers(mut self, headers: HeaderMap) -> Self {
        let mut current = None;
        for (name, value) in headers {
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), OAuthError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| OAuthError::InvalidHeader {
            name: name.to_string(),
            value: value.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|_| OAuthError::InvalidHeader {
        name: name.to_string(),
        value: value.to_string(),
    })?;
    Ok((header_name, header_value))
}

/// Splits `options` into the recognized keys and everything else.
pub(crate) fn split_options(
    mut options: ProviderOptions,
    recognized: &[&str],
) -> (ProviderOptions, ProviderOptions) {
    let mut configured = ProviderOptions::new();
    for key in recognized {
        if let Some(value) = options.remove(*key) {
            configured.insert((*key).to_string(), value);
        }
    }
    (configured, options)
}

/// Fails with a configuration error naming every required key that is absent or empty.
pub(crate) fn assert_required_options(
    options: &ProviderOptions,
    required: &[&str],
) -> Result<(), OAuthError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| options.get(*key).is_none_or(|value| value.is_empty()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OAuthError::configuration(format!(
            "required options missing or empty: {}",
            missing.join(", ")
        )))
    }
}
