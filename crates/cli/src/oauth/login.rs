// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive login: authorize in the browser, collect the code, exchange it
//! for a token, and persist the result.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::exchange::TokenExchanger;
use super::loopback::LoopbackServer;
use super::{build_auth_url, generate_state, validate_loopback_redirect, AuthError};
use crate::output::Printer;
use crate::prompt::Prompter;
use crate::store::{Config, ConfigStore, Token};

/// How long the loopback listener waits for the provider's redirect.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Launches the user's browser on a URL.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// `open` on macOS, `xdg-open` on Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "linux") {
            "xdg-open"
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "no browser launcher for this platform",
            ));
        };
        std::process::Command::new(program)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map(drop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    BuildingUrl,
    AwaitingCode,
    ExchangingToken,
    Persisted,
}

/// Where the authorization code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSource {
    /// Local callback listener on the redirect URI.
    Loopback { open_browser: bool },
    /// The user pastes the code at a prompt.
    Paste,
}

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub source: CodeSource,
    pub timeout: Duration,
    /// Caller-owned cancellation, e.g. Ctrl-C.
    pub cancel: CancellationToken,
}

impl LoginOptions {
    pub fn new(source: CodeSource) -> Self {
        Self { source, timeout: LOGIN_TIMEOUT, cancel: CancellationToken::new() }
    }
}

/// Drives one authorization-code login.
pub struct AuthOrchestrator<'a> {
    pub authorize_url: &'a str,
    pub exchanger: &'a TokenExchanger,
    pub store: &'a dyn ConfigStore,
    pub browser: &'a dyn BrowserOpener,
    pub prompter: &'a dyn Prompter,
    pub printer: Printer,
}

impl AuthOrchestrator<'_> {
    /// Run the flow. On success the token is stored in `config` and saved;
    /// on any failure `config` is left untouched.
    pub async fn login(&self, config: &mut Config, opts: &LoginOptions) -> Result<Token, AuthError> {
        debug!(phase = ?LoginPhase::BuildingUrl);
        let client_id =
            config.client_id().ok_or(AuthError::MissingCredential("client_id"))?.to_owned();
        let redirect_uri =
            config.redirect_uri().ok_or(AuthError::MissingCredential("redirect_uri"))?.to_owned();
        let client_secret = config.client_secret().unwrap_or_default().to_owned();
        let state = generate_state();
        let auth_url =
            build_auth_url(self.authorize_url, &client_id, &redirect_uri, &state, &config.scopes)?;

        debug!(phase = ?LoginPhase::AwaitingCode, source = ?opts.source);
        let code = match opts.source {
            CodeSource::Paste => self.paste_code(&auth_url)?,
            CodeSource::Loopback { open_browser } => {
                self.await_callback(&auth_url, &redirect_uri, &state, open_browser, opts).await?
            }
        };

        debug!(phase = ?LoginPhase::ExchangingToken);
        let resp = self.exchanger.exchange_code(&client_id, &client_secret, &redirect_uri, &code).await?;
        let token = resp.into_token(Utc::now());

        let mut updated = config.clone();
        updated.token = Some(token.clone());
        self.store.save(&updated).map_err(AuthError::Persistence)?;
        *config = updated;

        info!(phase = ?LoginPhase::Persisted, expires_at = ?token.expires_at, "login complete");
        Ok(token)
    }

    fn paste_code(&self, auth_url: &str) -> Result<String, AuthError> {
        self.printer.info(format_args!("Open this URL:\n{auth_url}"));
        let code = self.prompter.prompt("Authorization code: ").map_err(AuthError::InputUnavailable)?;
        if code.is_empty() {
            return Err(AuthError::MissingCode);
        }
        Ok(code)
    }

    async fn await_callback(
        &self,
        auth_url: &str,
        redirect_uri: &str,
        state: &str,
        open_browser: bool,
        opts: &LoginOptions,
    ) -> Result<String, AuthError> {
        let redirect = validate_loopback_redirect(redirect_uri)?;
        let server = LoopbackServer::bind(&redirect, state).await?;
        self.present(auth_url, open_browser);

        let deadline = opts.cancel.child_token();
        let timer = tokio::spawn({
            let deadline = deadline.clone();
            let timeout = opts.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                deadline.cancel();
            }
        });
        let result = server.wait(deadline).await;
        timer.abort();

        match result {
            Err(AuthError::Timeout) if opts.cancel.is_cancelled() => Err(AuthError::Cancelled),
            other => other,
        }
    }

    fn present(&self, auth_url: &str, open_browser: bool) {
        if open_browser {
            match self.browser.open(auth_url) {
                Ok(()) => return,
                Err(e) => debug!(err = %e, "browser launch failed"),
            }
        }
        self.printer.info(format_args!("Open this URL:\n{auth_url}"));
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
