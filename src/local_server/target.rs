use url::Url;

use crate::AuthError;

/// Where the callback server listens, taken from the redirect URI.
#[derive(Debug, Clone)]
pub(super) struct RedirectTarget {
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) path: String,
}

impl RedirectTarget {
    pub(super) fn parse(redirect_uri: &str) -> Result<Self, AuthError> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(AuthError::InvalidRedirectUri(
                "redirect uri must use http scheme".to_string(),
            ));
        }

        let host = url.host_str().ok_or_else(|| {
            AuthError::InvalidRedirectUri("redirect uri is missing host".to_string())
        })?;

        let port = url.port_or_known_default().ok_or_else(|| {
            AuthError::InvalidRedirectUri("redirect uri is missing port".to_string())
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
            path: url.path().to_string(),
        })
    }
}
