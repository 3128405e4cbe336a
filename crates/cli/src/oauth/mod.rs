// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth 2.0 authorization-code flow against the Oura provider.

pub mod exchange;
pub mod login;
pub mod loopback;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::Deserialize;

use crate::error::ErrorKind;
use crate::prompt::PromptError;
use crate::store::{StoreError, Token};

pub const AUTHORIZE_URL: &str = "https://cloud.ouraring.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8797/callback";
pub const DEFAULT_SCOPES: &[&str] = &["daily"];

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} required")]
    MissingCredential(&'static str),
    #[error("redirect uri invalid for local server: {0}")]
    InvalidRedirectForLocalServer(String),
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("authorization error: {0}")]
    Authorization(String),
    #[error("state mismatch")]
    StateMismatch,
    #[error("missing code")]
    MissingCode,
    #[error("auth timed out")]
    Timeout,
    #[error("auth cancelled")]
    Cancelled,
    #[error("authorization code required: {0}")]
    InputUnavailable(#[source] PromptError),
    #[error("token exchange failed ({status}): {body}")]
    TokenExchangeFailed { status: u16, body: String },
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
    #[error("config save failed: {0}")]
    Persistence(#[source] StoreError),
    #[error("callback server failed: {0}")]
    Server(#[source] std::io::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential(_)
            | Self::InvalidRedirectForLocalServer(_)
            | Self::StateMismatch
            | Self::MissingCode
            | Self::InputUnavailable(_) => ErrorKind::Validation,
            Self::Bind { .. } | Self::Server(_) => ErrorKind::Bind,
            Self::Timeout | Self::Cancelled => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Authorization(_) | Self::TokenExchangeFailed { .. } | Self::InvalidResponse(_) => {
                ErrorKind::Provider
            }
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Whether the manual `--paste` flow would sidestep this failure.
    pub fn suggests_paste(&self) -> bool {
        matches!(self, Self::InvalidRedirectForLocalServer(_) | Self::Bind { .. })
    }
}

/// Token endpoint response. Absent fields deserialize to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// `now + expires_in` as RFC 3339 UTC, only when `expires_in` is positive.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<String> {
        if self.expires_in <= 0 {
            return None;
        }
        let at = now + chrono::Duration::seconds(self.expires_in);
        Some(at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn new_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Fresh token from a code exchange.
    pub fn into_token(self, now: DateTime<Utc>) -> Token {
        Token {
            expires_at: self.expires_at(now),
            refresh_token: self.new_refresh_token().map(str::to_owned),
            token_type: self.token_type().map(str::to_owned),
            access_token: self.access_token,
        }
    }

    /// Fold a refresh response into an existing token. The refresh token and
    /// token type are kept unless the provider sent new non-empty values.
    pub fn apply_to(&self, token: &mut Token, now: DateTime<Utc>) {
        token.access_token.clone_from(&self.access_token);
        if let Some(refresh) = self.new_refresh_token() {
            token.refresh_token = Some(refresh.to_owned());
        }
        if let Some(expires_at) = self.expires_at(now) {
            token.expires_at = Some(expires_at);
        }
        if let Some(token_type) = self.token_type() {
            token.token_type = Some(token_type.to_owned());
        }
    }
}

/// Random CSRF state: 24 bytes, base64url without padding.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the authorization URL. Parameters are form-encoded in key order;
/// `state` and `scope` are omitted when empty.
pub fn build_auth_url(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    scopes: &[String],
) -> Result<String, AuthError> {
    if client_id.is_empty() {
        return Err(AuthError::MissingCredential("client_id"));
    }
    if redirect_uri.is_empty() {
        return Err(AuthError::MissingCredential("redirect_uri"));
    }

    let scope = scopes.join(" ");
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("client_id", client_id);
    query.append_pair("redirect_uri", redirect_uri);
    query.append_pair("response_type", "code");
    if !scope.is_empty() {
        query.append_pair("scope", &scope);
    }
    if !state.is_empty() {
        query.append_pair("state", state);
    }
    Ok(format!("{authorize_url}?{}", query.finish()))
}

/// Check that a redirect URI can be served by the loopback listener:
/// `http`, host `127.0.0.1` or `localhost`, explicit port.
pub fn validate_loopback_redirect(redirect_uri: &str) -> Result<url::Url, AuthError> {
    let invalid = |msg: &str| AuthError::InvalidRedirectForLocalServer(msg.to_owned());
    let parsed = url::Url::parse(redirect_uri).map_err(|e| invalid(&e.to_string()))?;
    if parsed.scheme() != "http" {
        return Err(invalid("redirect uri must be http"));
    }
    match parsed.host_str() {
        Some("127.0.0.1") | Some("localhost") => {}
        _ => return Err(invalid("redirect uri must use localhost or 127.0.0.1")),
    }
    if !has_explicit_port(redirect_uri) {
        return Err(invalid("redirect uri must include port"));
    }
    Ok(parsed)
}

/// Whether the authority carries a `:port`. `url` drops a port equal to the
/// scheme default, so `http://localhost:80/` is checked on the raw text.
fn has_explicit_port(uri: &str) -> bool {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
