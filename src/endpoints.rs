/// Spotify Accounts Service authorization endpoint.
pub const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
/// Spotify Accounts Service token endpoint.
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Base URL for Web API requests made with an authorized client.
pub const API_BASE_URL: &str = "https://api.spotify.com/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::spotify()
    }
}

impl Endpoints {
    pub fn spotify() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }
}
