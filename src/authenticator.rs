use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use url::form_urlencoded;

use crate::{
    ApiClient, AuthError, CallbackParams, CredentialSource, Credentials, Endpoints,
    EnvCredentials, Grant, HttpExchanger, Token, TokenExchanger, TokenRequest,
};
#[cfg(feature = "local-server")]
use crate::{LocalServer, LocalServerConfig, generate_state};

/// Drives the OAuth2 authorization code flow against the Spotify Accounts
/// Service.
///
/// ```no_run
/// # async fn run(callback_query: &str) -> Result<(), spotify_auth::AuthError> {
/// use spotify_auth::{Authenticator, CallbackParams, Scope};
///
/// let auth = Authenticator::new(
///     "http://localhost:8888/callback",
///     [Scope::UserLibraryRead, Scope::UserFollowRead],
/// );
/// // send the user here
/// let url = auth.auth_url("state-string");
///
/// // then, in the redirect handler:
/// let params = CallbackParams::from_query(callback_query);
/// let token = auth.token("state-string", &params).await?;
/// let client = auth.new_client(&token)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Authenticator {
    credentials: Credentials,
    redirect_uri: String,
    scopes: Vec<String>,
    endpoints: Endpoints,
    exchanger: Arc<dyn TokenExchanger>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("credentials", &self.credentials)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator with credentials taken from the `SPOTIFY_ID`
    /// and `SPOTIFY_SECRET` environment variables.
    ///
    /// The redirect URI must exactly match one registered for the app.
    /// Missing variables leave the credentials empty; the provider rejects
    /// them later.
    pub fn new<I>(redirect_uri: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::with_source(redirect_uri, scopes, &EnvCredentials::default())
    }

    pub fn with_source<I, S>(redirect_uri: impl Into<String>, scopes: I, source: &S) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        S: CredentialSource + ?Sized,
    {
        Self {
            credentials: source.credentials(),
            redirect_uri: redirect_uri.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            endpoints: Endpoints::spotify(),
            exchanger: Arc::new(HttpExchanger::default()),
        }
    }

    /// Returns a copy that uses the given client id and secret.
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::new(client_id, client_secret);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_exchanger(mut self, exchanger: Arc<dyn TokenExchanger>) -> Self {
        self.exchanger = exchanger;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// URL of the consent page for this app.
    ///
    /// `state` protects the user from CSRF; pass the same value to
    /// [`Authenticator::token`] to have it validated. See
    /// <https://tools.ietf.org/html/rfc6749#section-10.12>.
    pub fn auth_url(&self, state: &str) -> String {
        self.build_auth_url(state, false)
    }

    /// Like [`Authenticator::auth_url`], optionally forcing the consent
    /// dialog even when the user already approved the app.
    pub fn auth_url_with_dialog(&self, state: &str, show_dialog: bool) -> String {
        self.build_auth_url(state, show_dialog)
    }

    fn build_auth_url(&self, state: &str, show_dialog: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("client_id", &self.credentials.client_id);
        if !self.redirect_uri.is_empty() {
            query.append_pair("redirect_uri", &self.redirect_uri);
        }
        query.append_pair("response_type", "code");
        if !self.scopes.is_empty() {
            query.append_pair("scope", &self.scopes.join(" "));
        }
        if show_dialog {
            query.append_pair("show_dialog", "true");
        }
        if !state.is_empty() {
            query.append_pair("state", state);
        }

        let base = &self.endpoints.auth_url;
        let separator = if base.contains('?') { '&' } else { '?' };
        let url = format!("{base}{separator}{}", query.finish());
        debug!(scopes = self.scopes.len(), show_dialog, "built authorization url");
        url
    }

    /// Validates a redirect callback and exchanges its code for a token.
    ///
    /// Checks run in order: provider error, missing code, state. None of
    /// them touches the network.
    pub async fn token(
        &self,
        expected_state: &str,
        params: &CallbackParams,
    ) -> Result<Token, AuthError> {
        if let Some(reason) = params.error() {
            warn!(reason, "authorization denied by provider");
            return Err(AuthError::Denied {
                reason: reason.to_string(),
            });
        }

        let code = params.code().ok_or(AuthError::MissingCode)?;

        if params.state.as_deref() != Some(expected_state) {
            warn!("callback state does not match");
            return Err(AuthError::StateMismatch {
                expected: expected_state.to_string(),
                received: params.state.clone(),
            });
        }

        self.exchange(code).await
    }

    /// Parses a full callback URL and hands it to [`Authenticator::token`].
    pub async fn token_from_url(
        &self,
        expected_state: &str,
        callback_url: &str,
    ) -> Result<Token, AuthError> {
        let params = CallbackParams::from_url(callback_url)?;
        self.token(expected_state, &params).await
    }

    /// Exchanges an authorization code that the caller already extracted
    /// and validated.
    #[instrument(skip_all, fields(token_url = %self.endpoints.token_url))]
    pub async fn exchange(&self, code: &str) -> Result<Token, AuthError> {
        self.exchanger
            .exchange(TokenRequest {
                token_url: &self.endpoints.token_url,
                credentials: &self.credentials,
                grant: Grant::AuthorizationCode {
                    code,
                    redirect_uri: &self.redirect_uri,
                },
            })
            .await
    }

    /// Obtains a fresh access token. The provider may omit a new refresh
    /// token, in which case the one passed in is kept.
    #[instrument(skip_all, fields(token_url = %self.endpoints.token_url))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let mut token = self
            .exchanger
            .exchange(TokenRequest {
                token_url: &self.endpoints.token_url,
                credentials: &self.credentials,
                grant: Grant::RefreshToken { refresh_token },
            })
            .await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    /// Web API client that sends `token` with every request.
    pub fn new_client(&self, token: &Token) -> Result<ApiClient, AuthError> {
        ApiClient::new(token.clone(), &self.endpoints.api_base_url)
    }

    /// Runs the whole flow through a local callback server bound to the
    /// redirect URI. `on_authorize` receives the consent URL, typically to
    /// open it in a browser.
    #[cfg(feature = "local-server")]
    pub async fn run_local_flow<F>(&self, on_authorize: F) -> Result<Token, AuthError>
    where
        F: FnOnce(&str) -> Result<(), AuthError>,
    {
        let config = LocalServerConfig::from_redirect_uri(&self.redirect_uri)?;
        self.run_local_flow_with(config, false, on_authorize).await
    }

    /// Like [`Authenticator::run_local_flow`] with an explicit server
    /// configuration. The server is stopped before returning, on success
    /// and on every error path.
    #[cfg(feature = "local-server")]
    pub async fn run_local_flow_with<F>(
        &self,
        config: LocalServerConfig,
        show_dialog: bool,
        on_authorize: F,
    ) -> Result<Token, AuthError>
    where
        F: FnOnce(&str) -> Result<(), AuthError>,
    {
        let server = LocalServer::from_config(config)?;
        let state = generate_state()?;
        let url = self.auth_url_with_dialog(&state, show_dialog);
        let listener = server.bind()?;

        let handle = tokio::spawn(async move { server.listen_with_async(listener).await });

        if let Err(err) = on_authorize(&url) {
            handle.abort();
            // Wait for the task to drop so the redirect port is free again.
            let _ = handle.await;
            return Err(err);
        }

        let params = handle.await.map_err(|err| AuthError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })??;

        self.token(&state, &params).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::Scope;

    #[derive(Debug, Default)]
    struct StubExchanger {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String, String)>>,
        refresh_token: Option<String>,
    }

    impl StubExchanger {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for StubExchanger {
        async fn exchange(&self, request: TokenRequest<'_>) -> Result<Token, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let code = match request.grant {
                Grant::AuthorizationCode { code, .. } => code.to_string(),
                Grant::RefreshToken { refresh_token } => refresh_token.to_string(),
            };
            self.seen.lock().unwrap().push((
                request.token_url.to_string(),
                request.credentials.client_id.clone(),
                code,
            ));
            let mut token = Token::bearer("T1");
            token.refresh_token = self.refresh_token.clone();
            Ok(token)
        }
    }

    fn authenticator(stub: &Arc<StubExchanger>) -> Authenticator {
        Authenticator::with_source(
            "https://app.example/cb",
            ["read-library"],
            &Credentials::new("client-id", "client-secret"),
        )
        .with_exchanger(stub.clone())
    }

    fn query_pairs(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[test]
    fn auth_url_includes_required_params() {
        let stub = Arc::new(StubExchanger::default());
        let url = authenticator(&stub).auth_url("xyz123");

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fapp.example%2Fcb&response_type=code&scope=read-library&state=xyz123"
        ));

        let pairs = query_pairs(&url);
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["redirect_uri"], "https://app.example/cb");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "read-library");
        assert_eq!(pairs["state"], "xyz123");
    }

    #[test]
    fn auth_url_joins_scopes_with_spaces() {
        let auth = Authenticator::with_source(
            "http://localhost/cb",
            [Scope::UserLibraryRead, Scope::UserFollowRead],
            &Credentials::default(),
        );
        let pairs = query_pairs(&auth.auth_url("s"));
        assert_eq!(pairs["scope"], "user-library-read user-follow-read");
    }

    #[test]
    fn auth_url_omits_empty_scope_and_redirect() {
        let auth = Authenticator::with_source("", Vec::<String>::new(), &Credentials::default());
        let pairs = query_pairs(&auth.auth_url("s"));
        assert!(!pairs.contains_key("scope"));
        assert!(!pairs.contains_key("redirect_uri"));
        assert_eq!(pairs["client_id"], "");
    }

    #[test]
    fn auth_url_with_dialog_sets_flag() {
        let stub = Arc::new(StubExchanger::default());
        let pairs = query_pairs(&authenticator(&stub).auth_url_with_dialog("s", true));
        assert_eq!(pairs["show_dialog"], "true");
    }

    #[test]
    fn with_credentials_is_reflected_in_auth_url() {
        let stub = Arc::new(StubExchanger::default());
        let original = authenticator(&stub);
        let updated = original.clone().with_credentials("new-id", "new-secret");

        assert_eq!(query_pairs(&updated.auth_url("s"))["client_id"], "new-id");
        assert_eq!(original.credentials().client_id, "client-id");
        assert_eq!(updated.credentials().client_secret, "new-secret");
    }

    #[test]
    fn empty_environment_yields_empty_client_id() {
        let source = EnvCredentials::with_vars(
            "SPOTIFY_AUTH_TEST_NO_SUCH_ID",
            "SPOTIFY_AUTH_TEST_NO_SUCH_SECRET",
        );
        let auth = Authenticator::with_source("http://localhost/cb", ["a"], &source);
        assert_eq!(query_pairs(&auth.auth_url("s"))["client_id"], "");
    }

    #[tokio::test]
    async fn provider_error_is_denied_without_network() {
        let stub = Arc::new(StubExchanger::default());
        let params = CallbackParams::from_query("error=access_denied&code=ABC&state=xyz123");
        let err = authenticator(&stub).token("xyz123", &params).await.unwrap_err();

        assert!(matches!(err, AuthError::Denied { ref reason } if reason == "access_denied"));
        assert_eq!(err.to_string(), "spotify: auth failed - access_denied");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_or_empty_code_is_rejected() {
        let stub = Arc::new(StubExchanger::default());
        let auth = authenticator(&stub);
        for query in ["state=xyz123", "code=&state=xyz123", "error=&state=xyz123"] {
            let params = CallbackParams::from_query(query);
            let err = auth.token("xyz123", &params).await.unwrap_err();
            assert!(matches!(err, AuthError::MissingCode), "query: {query}");
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected_without_network() {
        let stub = Arc::new(StubExchanger::default());
        let auth = authenticator(&stub);
        for query in ["code=ABC&state=other", "code=ABC", "code=ABC&state="] {
            let params = CallbackParams::from_query(query);
            let err = auth.token("xyz123", &params).await.unwrap_err();
            assert!(
                matches!(err, AuthError::StateMismatch { ref expected, .. } if expected == "xyz123"),
                "query: {query}"
            );
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_state_never_matches_empty_expectation() {
        let stub = Arc::new(StubExchanger::default());
        let params = CallbackParams::from_query("code=ABC");
        let err = authenticator(&stub).token("", &params).await.unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch { received: None, .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn matching_callback_returns_exchanged_token() {
        let stub = Arc::new(StubExchanger::default());
        let params = CallbackParams::from_query("state=xyz123&code=ABC");
        let token = authenticator(&stub).token("xyz123", &params).await.unwrap();

        assert_eq!(token, Token::bearer("T1"));
        assert_eq!(stub.calls(), 1);
        assert_eq!(
            stub.seen.lock().unwrap().as_slice(),
            &[(
                "https://accounts.spotify.com/api/token".to_string(),
                "client-id".to_string(),
                "ABC".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn token_from_url_parses_callback() {
        let stub = Arc::new(StubExchanger::default());
        let token = authenticator(&stub)
            .token_from_url("xyz123", "https://app.example/cb?code=ABC&state=xyz123")
            .await
            .unwrap();
        assert_eq!(token.access_token, "T1");
    }

    #[tokio::test]
    async fn exchange_skips_callback_checks() {
        let stub = Arc::new(StubExchanger::default());
        let token = authenticator(&stub).exchange("ABC").await.unwrap();
        assert_eq!(token.access_token, "T1");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token() {
        let stub = Arc::new(StubExchanger::default());
        let token = authenticator(&stub).refresh("R0").await.unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("R0"));

        let rotating = Arc::new(StubExchanger {
            refresh_token: Some("R1".to_string()),
            ..StubExchanger::default()
        });
        let token = authenticator(&rotating).refresh("R0").await.unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn new_client_carries_token() {
        let stub = Arc::new(StubExchanger::default());
        let client = authenticator(&stub)
            .new_client(&Token::bearer("T1"))
            .unwrap();
        assert_eq!(client.token().access_token, "T1");
        assert_eq!(client.base_url().as_str(), "https://api.spotify.com/v1/");
    }

    #[test]
    fn auth_url_omits_empty_state() {
        let stub = Arc::new(StubExchanger::default());
        let pairs = query_pairs(&authenticator(&stub).auth_url(""));
        assert!(!pairs.contains_key("state"));
        assert_eq!(pairs["response_type"], "code");
    }

    #[tokio::test]
    async fn token_goes_through_http_exchanger() {
        use serde_json::json;
        use wiremock::matchers::{body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("code=ABC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "T1",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Authenticator::with_source(
            "https://app.example/cb",
            ["read-library"],
            &Credentials::new("client-id", "client-secret"),
        )
        .with_endpoints(
            Endpoints::spotify().with_token_url(format!("{}/api/token", server.uri())),
        );

        let params = CallbackParams::from_query("code=ABC&state=xyz123");
        let token = auth.token("xyz123", &params).await.unwrap();
        assert_eq!(token.access_token, "T1");
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());

        let forged = CallbackParams::from_query("code=ABC&state=forged");
        assert!(matches!(
            auth.token("xyz123", &forged).await,
            Err(AuthError::StateMismatch { .. })
        ));
    }

    #[cfg(feature = "local-server")]
    mod local_flow {
        use std::time::Duration;

        use super::*;

        fn free_port() -> u16 {
            let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
            listener.local_addr().unwrap().port()
        }

        fn config(port: u16) -> LocalServerConfig {
            LocalServerConfig::new("127.0.0.1", port, "/callback")
                .with_timeout(Duration::from_secs(5))
        }

        fn send_callback(port: u16, query: String) {
            tokio::spawn(reqwest::get(format!(
                "http://127.0.0.1:{port}/callback?{query}"
            )));
        }

        #[tokio::test]
        async fn validates_generated_state_against_callback() {
            let stub = Arc::new(StubExchanger::default());
            let port = free_port();

            let token = authenticator(&stub)
                .run_local_flow_with(config(port), false, |url| {
                    let state = query_pairs(url)["state"].clone();
                    assert_eq!(state.len(), 32);
                    send_callback(port, format!("code=ABC&state={state}"));
                    Ok(())
                })
                .await
                .unwrap();

            assert_eq!(token.access_token, "T1");
            assert_eq!(stub.calls(), 1);
            assert_eq!(stub.seen.lock().unwrap()[0].2, "ABC");
        }

        #[tokio::test]
        async fn rejects_callback_with_foreign_state() {
            let stub = Arc::new(StubExchanger::default());
            let port = free_port();

            let err = authenticator(&stub)
                .run_local_flow_with(config(port), true, |url| {
                    assert_eq!(query_pairs(url)["show_dialog"], "true");
                    send_callback(port, "code=ABC&state=forged".to_string());
                    Ok(())
                })
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                AuthError::StateMismatch { received: Some(ref received), .. } if received == "forged"
            ));
            assert_eq!(stub.calls(), 0);
        }

        #[tokio::test]
        async fn failed_authorize_releases_redirect_port() {
            let stub = Arc::new(StubExchanger::default());
            let port = free_port();
            let untimed = LocalServerConfig::new("127.0.0.1", port, "/callback");

            let err = authenticator(&stub)
                .run_local_flow_with(untimed, false, |_| Err(AuthError::MissingCode))
                .await
                .unwrap_err();

            assert!(matches!(err, AuthError::MissingCode));
            assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
            assert_eq!(stub.calls(), 0);
        }
    }
}
