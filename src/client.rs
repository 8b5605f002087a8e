use reqwest::{
    Client, Method, RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use url::Url;

use crate::{AuthError, Token};

/// HTTP client for the Spotify Web API that sends its token with every
/// request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    token: Token,
    base_url: Url,
}

impl ApiClient {
    pub fn new(token: Token, base_url: &str) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_header(&token)?);
        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            token,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Starts a request for `path`, resolved against the API base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AuthError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        Ok(self.http.request(method, url))
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder, AuthError> {
        self.request(Method::GET, path)
    }
}

fn bearer_header(token: &Token) -> Result<HeaderValue, AuthError> {
    let value = format!("Bearer {}", token.access_token);
    let mut header = HeaderValue::from_str(&value).map_err(|_| AuthError::InvalidHeader {
        name: AUTHORIZATION.to_string(),
        value: "Bearer <redacted>".to_string(),
    })?;
    header.set_sensitive(true);
    Ok(header)
}
