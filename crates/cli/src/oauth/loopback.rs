// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot HTTP listener that receives the provider's redirect on the
//! loopback interface.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::AuthError;

/// Upper bound on graceful shutdown before the serve task is aborted.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_BODY: &str = "Authorization complete. You can close this window.\n";

type Outcome = Result<String, AuthError>;

struct CallbackState {
    path: String,
    expected_state: String,
    resolved: AtomicBool,
    tx: mpsc::Sender<Outcome>,
}

/// A bound callback listener. Resolves once with the first callback's outcome.
pub struct LoopbackServer {
    addr: SocketAddr,
    rx: mpsc::Receiver<Outcome>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl LoopbackServer {
    /// Bind `host:port` from `redirect` and serve its path. An empty
    /// `expected_state` disables the state check.
    pub async fn bind(redirect: &url::Url, expected_state: &str) -> Result<Self, AuthError> {
        let host = redirect.host_str().unwrap_or("127.0.0.1");
        let port = redirect.port_or_known_default().unwrap_or(0);
        let path = match redirect.path() {
            "" => "/",
            p => p,
        };

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| AuthError::Bind { addr: format!("{host}:{port}"), source })?;
        let addr = listener.local_addr().map_err(AuthError::Server)?;

        let (tx, rx) = mpsc::channel(1);
        let state = Arc::new(CallbackState {
            path: path.to_owned(),
            expected_state: expected_state.to_owned(),
            resolved: AtomicBool::new(false),
            tx: tx.clone(),
        });
        // Matched by hand: the path is user input, not route syntax.
        let app = Router::new().fallback(handle_callback).with_state(state);

        let shutdown = CancellationToken::new();
        let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
        let task = tokio::spawn(async move {
            if let Err(e) = serve.await {
                let _ = tx.try_send(Err(AuthError::Server(e)));
            }
        });

        debug!(%addr, path, "callback listener started");
        Ok(Self { addr, rx, shutdown, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the first callback outcome or `cancel`. The listener is shut
    /// down before this returns, on every path.
    pub async fn wait(mut self, cancel: CancellationToken) -> Result<String, AuthError> {
        let outcome = tokio::select! {
            received = self.rx.recv() => received.unwrap_or_else(|| {
                Err(AuthError::Server(std::io::Error::other("callback listener exited")))
            }),
            _ = cancel.cancelled() => Err(AuthError::Timeout),
        };
        self.stop().await;
        outcome
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let mut task = self.task;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            warn!(addr = %self.addr, "callback listener did not drain in time; aborting");
            task.abort();
        }
        debug!(addr = %self.addr, "callback listener stopped");
    }
}

async fn handle_callback(
    State(cb): State<Arc<CallbackState>>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    if uri.path() != cb.path {
        return (StatusCode::NOT_FOUND, "not found");
    }
    let outcome = evaluate_callback(&params, &cb.expected_state);
    let response = match &outcome {
        Ok(_) => (StatusCode::OK, SUCCESS_BODY),
        Err(AuthError::Authorization(_)) => (StatusCode::BAD_REQUEST, "authorization failed"),
        Err(AuthError::StateMismatch) => (StatusCode::BAD_REQUEST, "state mismatch"),
        Err(_) => (StatusCode::BAD_REQUEST, "missing code"),
    };

    if cb.resolved.swap(true, Ordering::SeqCst) {
        debug!("callback after resolution ignored");
    } else {
        let _ = cb.tx.try_send(outcome);
    }
    response
}

/// Classify a callback query. A provider `error` wins over everything else,
/// then the state check, then the presence of `code`.
pub fn evaluate_callback(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<String, AuthError> {
    if let Some(reason) = params.get("error").filter(|e| !e.is_empty()) {
        return Err(AuthError::Authorization(reason.clone()));
    }
    if !expected_state.is_empty()
        && params.get("state").map(String::as_str).unwrap_or_default() != expected_state
    {
        return Err(AuthError::StateMismatch);
    }
    match params.get("code").filter(|c| !c.is_empty()) {
        Some(code) => Ok(code.clone()),
        None => Err(AuthError::MissingCode),
    }
}

#[cfg(test)]
#[path = "loopback_tests.rs"]
mod tests;
