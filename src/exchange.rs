use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, header::ACCEPT};
use tracing::{debug, instrument};

use crate::{AuthError, Credentials, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant<'a> {
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
    },
}

impl<'a> Grant<'a> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }

    fn form_params(&self) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("grant_type", self.grant_type())];
        match *self {
            Grant::AuthorizationCode { code, redirect_uri } => {
                params.push(("code", code));
                if !redirect_uri.is_empty() {
                    params.push(("redirect_uri", redirect_uri));
                }
            }
            Grant::RefreshToken { refresh_token } => {
                params.push(("refresh_token", refresh_token));
            }
        }
        params
    }
}

/// One request against a token endpoint.
#[derive(Debug, Clone, Copy)]
pub struct TokenRequest<'a> {
    pub token_url: &'a str,
    pub credentials: &'a Credentials,
    pub grant: Grant<'a>,
}

/// Trades a grant for a token at the provider's token endpoint.
///
/// Errors are returned to the caller of the authenticator unchanged.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, request: TokenRequest<'_>) -> Result<Token, AuthError>;
}

/// Posts form-encoded grants and authenticates with HTTP Basic.
#[derive(Debug, Clone)]
pub struct HttpExchanger {
    http: Client,
}

impl Default for HttpExchanger {
    /// Uses `reqwest`'s default client, which panics only if the TLS backend
    /// cannot be initialised.
    fn default() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl HttpExchanger {
    pub fn new() -> Result<Self, AuthError> {
        Ok(Self {
            http: Client::builder().build()?,
        })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AuthError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TokenExchanger for HttpExchanger {
    #[instrument(
        skip_all,
        fields(token_url = %request.token_url, grant_type = request.grant.grant_type())
    )]
    async fn exchange(&self, request: TokenRequest<'_>) -> Result<Token, AuthError> {
        let credentials = request.credentials;
        let response = self
            .http
            .post(request.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(ACCEPT, "application/json")
            .form(&request.grant.form_params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "token endpoint rejected grant");
            return Err(AuthError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut token: Token =
            serde_json::from_str(&body).map_err(|err| AuthError::InvalidResponse {
                message: err.to_string(),
                body,
            })?;
        token.stamp_expiry(Utc::now());

        debug!(
            expires_at = ?token.expires_at,
            has_refresh_token = token.refresh_token.is_some(),
            "token issued"
        );
        Ok(token)
    }
}
