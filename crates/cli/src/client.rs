// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-authenticated API client with refresh-on-401.

use std::collections::BTreeMap;
use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::ErrorKind;
use crate::oauth::exchange::TokenExchanger;
use crate::oauth::AuthError;
use crate::store::{Config, ConfigStore, EnvOverrides};

pub const API_BASE_URL: &str = "https://api.ouraring.com";

static CRYPTO_INIT: Once = Once::new();

/// Install the process-wide rustls provider once.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client for every outbound call, bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    ensure_crypto();
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("oura/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Status and body of an API response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("missing client credentials for token refresh")]
    MissingClientCredentials,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated | Self::MissingClientCredentials => ErrorKind::Unauthenticated,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Owns the loaded [`Config`] for one invocation and keeps its token current.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    exchanger: TokenExchanger,
    config: Config,
    store: Arc<dyn ConfigStore>,
    overrides: EnvOverrides,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        exchanger: TokenExchanger,
        config: Config,
        store: Arc<dyn ConfigStore>,
        overrides: EnvOverrides,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url, exchanger, config, store, overrides }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// GET `path` with `query`. A 401 triggers at most one token refresh and
    /// one retry; any other status is returned as-is.
    pub async fn get(
        &mut self,
        path: &str,
        query: &BTreeMap<String, String>,
    ) -> Result<Response, ClientError> {
        let url = self.request_url(path, query);
        let mut refreshed = false;
        loop {
            let access_token = self.config.access_token().ok_or(ClientError::Unauthenticated)?;
            debug!("GET {url}");
            let resp = self.http.get(&url).bearer_auth(access_token).send().await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            let response = Response { status, body };

            if status != 401 || refreshed {
                return Ok(response);
            }
            refreshed = true;
            match self.try_refresh().await {
                Ok(true) => continue,
                Ok(false) => return Ok(response),
                Err(RefreshError::MissingClientCredentials) => {
                    return Err(ClientError::MissingClientCredentials);
                }
                Err(RefreshError::Grant(e)) => {
                    debug!(err = %e, "token refresh failed");
                    return Ok(response);
                }
            }
        }
    }

    /// `Ok(false)` when there is no refresh token to use.
    async fn try_refresh(&mut self) -> Result<bool, RefreshError> {
        let Some(refresh_token) = self.config.token.as_ref().and_then(|t| t.refresh_token()) else {
            return Ok(false);
        };
        let (Some(client_id), Some(client_secret)) =
            (self.config.client_id(), self.config.client_secret())
        else {
            return Err(RefreshError::MissingClientCredentials);
        };

        let resp = self
            .exchanger
            .refresh(client_id, client_secret, refresh_token)
            .await
            .map_err(RefreshError::Grant)?;
        if let Some(token) = self.config.token.as_mut() {
            resp.apply_to(token, Utc::now());
        }
        debug!("access token refreshed");

        if !self.overrides.persist_allowed() {
            debug!("token supplied by environment; refreshed token not saved");
        } else if let Err(e) = self.store.save(&self.config) {
            debug!(err = %e, "token refresh save failed");
        }
        Ok(true)
    }

    fn request_url(&self, path: &str, query: &BTreeMap<String, String>) -> String {
        let mut url = format!("{}{path}", self.base_url);
        let mut encoded = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in query.iter().filter(|(_, v)| !v.trim().is_empty()) {
            encoded.append_pair(key, value);
            any = true;
        }
        if any {
            url.push('?');
            url.push_str(&encoded.finish());
        }
        url
    }
}

enum RefreshError {
    MissingClientCredentials,
    Grant(AuthError),
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
