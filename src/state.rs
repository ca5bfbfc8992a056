use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::OAuthError;

const STATE_BYTES: usize = 16;

/// Random, URL-safe value for the `state` parameter of an authorization URL.
pub fn generate_state() -> Result<String, OAuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| OAuthError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::generate_state;

    #[test]
    fn generates_url_safe_state() {
        let state = generate_state().unwrap();
        assert_eq!(state.len(), 22);
        assert!(!state.contains('='), "state should be unpadded");
        assert!(!state.contains('+'), "state should be url safe");
        assert!(!state.contains('/'), "state should be url safe");
        assert_ne!(state, generate_state().unwrap());
    }
}
