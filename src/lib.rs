//! OAuth 2.0 authorization code flow for the Spotify Web API.
//!
//! [`Authenticator`] builds the consent URL, validates the redirect
//! callback, trades the code for a [`Token`] and hands back an
//! [`ApiClient`] bound to it.

mod authenticator;
mod client;
mod credentials;
mod endpoints;
mod error;
mod exchange;
#[cfg(feature = "local-server")]
mod local_server;
mod scope;
mod state;
mod types;

pub use authenticator::Authenticator;
pub use client::ApiClient;
pub use credentials::{
    CLIENT_ID_VAR, CLIENT_SECRET_VAR, CredentialSource, Credentials, EnvCredentials,
};
pub use endpoints::{API_BASE_URL, AUTH_URL, Endpoints, TOKEN_URL};
pub use error::AuthError;
pub use exchange::{Grant, HttpExchanger, TokenExchanger, TokenRequest};
#[cfg(feature = "local-server")]
pub use local_server::{LocalServer, LocalServerConfig};
pub use scope::{Scope, UnknownScope};
pub use state::generate_state;
pub use types::{CallbackParams, Token};
