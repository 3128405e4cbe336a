// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: in-memory store, scripted servers, and fakes.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;

use crate::oauth::login::BrowserOpener;
use crate::prompt::{PromptError, Prompter};
use crate::store::{Config, ConfigStore, StoreError};

/// Assert that `$expr` is `Err` and its display contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// [`ConfigStore`] kept in memory, counting saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Config>>,
    saves: AtomicU32,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every save fails.
    pub fn failing() -> Self {
        Self { fail_saves: true, ..Self::default() }
    }

    pub fn with_config(config: Config) -> Self {
        Self { saved: Mutex::new(Some(config)), ..Self::default() }
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn saved(&self) -> Option<Config> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<Config>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, config: &Config) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        if self.fail_saves {
            return Err(StoreError::Io {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(())
    }
}

/// One request seen by a [`ScriptedServer`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// HTTP server on `127.0.0.1:0` answering every request from a script of
/// `(status, body)` pairs. The last entry repeats once the script runs out.
pub struct ScriptedServer {
    addr: SocketAddr,
    calls: Arc<AtomicU32>,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedServer {
    pub async fn start(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        let calls = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let app = Router::new().fallback({
            let calls = Arc::clone(&calls);
            let log = Arc::clone(&log);
            move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let calls = Arc::clone(&calls);
                let log = Arc::clone(&log);
                let responses = Arc::clone(&responses);
                async move {
                    let idx = calls.fetch_add(1, Ordering::Relaxed) as usize;
                    let authorization = headers
                        .get(axum::http::header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    log.lock().unwrap_or_else(PoisonError::into_inner).push(Recorded {
                        method,
                        uri: uri.to_string(),
                        authorization,
                        body,
                    });
                    let (status, body) = responses
                        .get(idx)
                        .or_else(|| responses.last())
                        .cloned()
                        .unwrap_or((500, "{}".to_owned()));
                    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
                }
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, calls, log })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr><path>`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Reserve an ephemeral loopback port and release it.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Browser fake. Records every URL; optionally completes the redirect by
/// calling the loopback callback with `code` and the URL's own `state`.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    opened: Mutex<Vec<String>>,
    code: Option<String>,
    fail: bool,
}

impl FakeBrowser {
    /// Records URLs without following them.
    pub fn recording() -> Self {
        Self::default()
    }

    /// Fails every open.
    pub fn broken() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Follows the redirect and hands `code` to the callback.
    pub fn approving(code: &str) -> Self {
        Self { code: Some(code.to_owned()), ..Self::default() }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl BrowserOpener for FakeBrowser {
    fn open(&self, auth_url: &str) -> std::io::Result<()> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).push(auth_url.to_owned());
        if self.fail {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"));
        }
        let Some(code) = self.code.clone() else {
            return Ok(());
        };
        let parsed = url::Url::parse(auth_url)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let param = |name: &str| {
            parsed.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
        };
        let redirect = param("redirect_uri").unwrap_or_default();
        let state = param("state").unwrap_or_default();
        let callback = format!(
            "{redirect}?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("code", &code)
                .append_pair("state", &state)
                .finish()
        );
        let http = crate::client::build_http_client(std::time::Duration::from_secs(5))
            .map_err(std::io::Error::other)?;
        tokio::spawn(async move {
            let _ = http.get(callback).send().await;
        });
        Ok(())
    }
}

/// Prompter answering from a fixed script, recording the labels it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
    disabled: bool,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| (*a).to_owned()).collect()),
            ..Self::default()
        }
    }

    /// Behaves like `--no-input`.
    pub fn disabled() -> Self {
        Self { disabled: true, ..Self::default() }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next(&self, label: &str) -> Result<String, PromptError> {
        if self.disabled {
            return Err(PromptError::Disabled);
        }
        self.asked.lock().unwrap_or_else(PoisonError::into_inner).push(label.to_owned());
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(PromptError::Closed)
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, label: &str) -> Result<String, PromptError> {
        self.next(label)
    }

    fn prompt_secret(&self, label: &str) -> Result<String, PromptError> {
        self.next(label)
    }
}
