// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token endpoint grants.

use tracing::{debug, warn};

use super::{AuthError, TokenResponse};

/// Posts `authorization_code` and `refresh_token` grants to the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http: reqwest::Client,
    token_url: String,
}

impl TokenExchanger {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self { http, token_url: token_url.into() }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Trade an authorization code for a token.
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.post(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Obtain a new access token with a refresh token.
    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.post(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .await
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let grant = form.first().map(|(_, v)| *v).unwrap_or_default();
        debug!(grant, url = %self.token_url, "token request");

        let resp = self.http.post(&self.token_url).form(form).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(grant, status = status.as_u16(), "token endpoint rejected grant");
            return Err(AuthError::TokenExchangeFailed {
                status: status.as_u16(),
                body: text.trim().to_owned(),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(AuthError::InvalidResponse("missing access_token".to_owned()));
        }
        Ok(token)
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
