use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use tokio::sync::oneshot;
use tracing::debug;

use crate::{AuthError, CallbackParams};

type ResponseResult = Result<CallbackParams, AuthError>;
type ResponseSender = oneshot::Sender<ResponseResult>;
type ResponseReceiver = oneshot::Receiver<ResponseResult>;
pub(super) type SharedResponseSender = Arc<Mutex<Option<ResponseSender>>>;

#[derive(Clone)]
pub(super) struct LocalServerState {
    pub(super) success_html: String,
    pub(super) error_html: String,
    pub(super) response_tx: SharedResponseSender,
}

pub(super) fn send_response(response_tx: &SharedResponseSender, response: ResponseResult) {
    if let Ok(mut guard) = response_tx.lock() {
        if let Some(sender) = guard.take() {
            let _ = sender.send(response);
        }
    }
}

/// Captures the first request that carries either a code or a provider
/// error. Validation is left to the authenticator.
pub(super) async fn callback_handler(
    State(state): State<LocalServerState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let params = CallbackParams::from_query(&query.unwrap_or_default());

    if params.error().is_some() {
        send_response(&state.response_tx, Ok(params));
        return (StatusCode::OK, Html(state.error_html));
    }

    if params.code().is_none() {
        debug!("ignoring callback without code");
        return (StatusCode::BAD_REQUEST, Html(state.error_html));
    }

    send_response(&state.response_tx, Ok(params));
    (StatusCode::OK, Html(state.success_html))
}

pub(super) async fn fallback_handler(State(state): State<LocalServerState>) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(state.error_html))
}

pub(super) async fn wait_for_response(
    response_rx: ResponseReceiver,
    timeout: Option<Duration>,
) -> Result<CallbackParams, AuthError> {
    let closed = || AuthError::InvalidResponse {
        message: "local server response channel closed".to_string(),
        body: String::new(),
    };

    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, response_rx)
            .await
            .map_err(|_| AuthError::LocalServerTimeout { timeout })?
            .map_err(|_| closed())?,
        None => response_rx.await.map_err(|_| closed())?,
    }
}
