use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

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

    #[error("spotify: auth failed - {reason}")]
    Denied { reason: String },

    #[error("spotify: didn't get access code")]
    MissingCode,

    #[error("spotify: redirect state parameter doesn't match (expected={expected}, received={})", .received.as_deref().unwrap_or("<none>"))]
    StateMismatch {
        expected: String,
        received: Option<String>,
    },

    #[cfg(feature = "local-server")]
    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[cfg(feature = "local-server")]
    #[error("local server timed out after {timeout:?}")]
    LocalServerTimeout { timeout: std::time::Duration },
}

impl AuthError {
    /// True for the errors raised while validating a callback, before any
    /// request reaches the token endpoint.
    pub fn is_callback_rejection(&self) -> bool {
        matches!(
            self,
            Self::Denied { .. } | Self::MissingCode | Self::StateMismatch { .. }
        )
    }
}
