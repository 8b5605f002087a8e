use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::AuthError;

const STATE_BYTES: usize = 24;

/// Generates an unguessable, URL-safe `state` value for one authorization
/// attempt. The same value must be handed to [`Authenticator::token`] when
/// the callback arrives.
///
/// [`Authenticator::token`]: crate::Authenticator::token
pub fn generate_state() -> Result<String, AuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
