use std::future::IntoFuture;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::{AuthError, CallbackParams};

use super::config::LocalServerConfig;
use super::http::{LocalServerState, callback_handler, fallback_handler, wait_for_response};
use super::target::RedirectTarget;

/// One-shot HTTP server that waits for the provider to redirect the
/// browser back to the redirect URI.
#[derive(Debug, Clone)]
pub struct LocalServer {
    target: RedirectTarget,
    success_html: String,
    error_html: String,
    timeout: Option<Duration>,
}

impl LocalServer {
    pub fn from_config(config: LocalServerConfig) -> Result<Self, AuthError> {
        let redirect_uri = config.redirect_uri();
        Ok(Self {
            target: RedirectTarget::parse(&redirect_uri)?,
            success_html: config.success_html,
            error_html: config.error_html,
            timeout: config.timeout,
        })
    }

    pub fn bind(&self) -> Result<TcpListener, AuthError> {
        TcpListener::bind((self.target.host.as_str(), self.target.port)).map_err(AuthError::from)
    }

    /// Serves on `listener` until a callback arrives. The listener is
    /// released when this future completes or is dropped.
    pub async fn listen_with_async(
        &self,
        listener: TcpListener,
    ) -> Result<CallbackParams, AuthError> {
        let (response_tx, response_rx) = oneshot::channel::<Result<CallbackParams, AuthError>>();

        let state = LocalServerState {
            success_html: self.success_html.clone(),
            error_html: self.error_html.clone(),
            response_tx: Arc::new(Mutex::new(Some(response_tx))),
        };

        let app = Router::new()
            .route(&self.target.path, get(callback_handler))
            .fallback(fallback_handler)
            .with_state(state);

        listener.set_nonblocking(true)?;
        let listener = TokioTcpListener::from_std(listener)?;
        info!(
            host = %self.target.host,
            port = self.target.port,
            path = %self.target.path,
            "waiting for authorization callback"
        );

        let response = tokio::select! {
            served = axum::serve(listener, app).into_future() => {
                let message = match served {
                    Ok(()) => "local server stopped before a callback arrived".to_string(),
                    Err(err) => err.to_string(),
                };
                Err(AuthError::InvalidResponse {
                    message,
                    body: String::new(),
                })
            }
            response = wait_for_response(response_rx, self.timeout) => response,
        };

        debug!(received = response.is_ok(), "local server stopped");
        response
    }

    pub async fn listen_once_async(&self) -> Result<CallbackParams, AuthError> {
        let listener = self.bind()?;
        self.listen_with_async(listener).await
    }
}
