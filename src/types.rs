use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AuthError;

/// Query parameters delivered to the redirect URI after the user answers
/// the consent screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn new(code: Option<&str>, state: Option<&str>) -> Self {
        Self {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: None,
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            // First occurrence wins, as with a form-decoded query lookup.
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    /// Parses a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_url(callback_url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(callback_url)?;
        Ok(Self::from_pairs(url.query_pairs().into_owned()))
    }

    /// Provider error reason, if one was sent and is non-empty.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|value| !value.is_empty())
    }

    /// Authorization code, if one was sent and is non-empty.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Absolute expiry, stamped when the token is issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            scope: None,
            expires_in: None,
            expires_at: None,
            extra: HashMap::new(),
        }
    }

    /// Fills `expires_at` from `expires_in` relative to `issued_at`, unless
    /// it is already set.
    pub fn stamp_expiry(&mut self, issued_at: DateTime<Utc>) {
        if self.expires_at.is_some() {
            return;
        }
        self.expires_at = self
            .expires_in
            .and_then(|secs| TimeDelta::try_seconds(i64::try_from(secs).ok()?))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));
    }

    /// True once `now` is past the expiry. Tokens without a known expiry
    /// never report as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Granted scopes, split on whitespace.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().collect())
            .unwrap_or_default()
    }
}
