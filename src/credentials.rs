use std::fmt;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_SECRET";

/// A client id / secret pair registered in the Spotify developer dashboard.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.client_id.is_empty() && self.client_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Supplies client credentials when an authenticator is constructed.
pub trait CredentialSource {
    fn credentials(&self) -> Credentials;
}

impl CredentialSource for Credentials {
    fn credentials(&self) -> Credentials {
        self.clone()
    }
}

/// Reads credentials from environment variables, `SPOTIFY_ID` and
/// `SPOTIFY_SECRET` unless overridden. Unset or non-unicode variables read as
/// empty strings.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    id_var: String,
    secret_var: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self {
            id_var: CLIENT_ID_VAR.to_string(),
            secret_var: CLIENT_SECRET_VAR.to_string(),
        }
    }
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(id_var: impl Into<String>, secret_var: impl Into<String>) -> Self {
        Self {
            id_var: id_var.into(),
            secret_var: secret_var.into(),
        }
    }

    /// Resolves the configured variable names through `lookup` instead of the
    /// process environment.
    pub fn resolve_with<F>(&self, lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        Credentials {
            client_id: lookup(&self.id_var).unwrap_or_default(),
            client_secret: lookup(&self.secret_var).unwrap_or_default(),
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn credentials(&self) -> Credentials {
        let credentials = self.resolve_with(|name| std::env::var(name).ok());
        if credentials.client_id.is_empty() {
            tracing::debug!(var = %self.id_var, "client id not set in environment");
        }
        credentials
    }
}
