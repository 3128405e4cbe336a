// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oura auth login|status|logout`.

use std::path::Path;

use serde_json::json;

use super::Context;
use crate::config::LoginArgs;
use crate::error::ExitCode;
use crate::oauth::login::{AuthOrchestrator, CodeSource, LoginOptions, SystemBrowser};
use crate::oauth::{DEFAULT_REDIRECT_URI, DEFAULT_SCOPES};
use crate::output::Printer;
use crate::prompt::{Prompter, TerminalPrompter};
use crate::store::{self, Config, ConfigStore, FileStore};

pub async fn login(ctx: &Context, args: &LoginArgs) -> ExitCode {
    let mut loaded = match ctx.load_or_report() {
        Ok(l) => l,
        Err(code) => return code,
    };
    if let Err(msg) = apply_login_flags(&mut loaded.config, args) {
        ctx.printer.error(msg);
        return ExitCode::Failure;
    }

    let prompter = TerminalPrompter::new(ctx.global.no_input);
    if let Err(msg) = ensure_client_credentials(&prompter, &mut loaded.config) {
        ctx.printer.error(msg);
        return ExitCode::Usage;
    }

    let http = match ctx.http_client() {
        Ok(h) => h,
        Err(e) => {
            ctx.printer.error(format_args!("http client setup failed: {e}"));
            return ExitCode::Failure;
        }
    };
    let exchanger = ctx.exchanger(http);
    let orchestrator = AuthOrchestrator {
        authorize_url: &ctx.global.authorize_url,
        exchanger: &exchanger,
        store: loaded.store.as_ref(),
        browser: &SystemBrowser,
        prompter: &prompter,
        printer: ctx.printer,
    };
    let source = if args.paste {
        CodeSource::Paste
    } else {
        CodeSource::Loopback { open_browser: !args.no_open }
    };
    let opts = LoginOptions { cancel: ctx.cancel.clone(), ..LoginOptions::new(source) };

    match orchestrator.login(&mut loaded.config, &opts).await {
        Ok(token) => {
            ctx.printer.info("auth complete; token saved");
            if let Some(expires_at) = &token.expires_at {
                ctx.printer.info(format_args!("token expires at {expires_at}"));
            }
            ExitCode::Success
        }
        Err(e) => {
            ctx.printer.error(format_args!("auth failed: {e}"));
            if e.suggests_paste() {
                ctx.printer.error("use --paste for manual flow");
            }
            e.kind().exit_code()
        }
    }
}

/// Overlay `auth login` flags on the loaded config and fill in defaults.
pub fn apply_login_flags(config: &mut Config, args: &LoginArgs) -> Result<(), String> {
    if let Some(id) = args.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        config.client_id = Some(id.to_owned());
    }
    if let Some(uri) = args.redirect_uri.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        config.redirect_uri = Some(uri.to_owned());
    }
    if let Some(raw) = args.scopes.as_deref().filter(|s| !s.trim().is_empty()) {
        config.scopes = store::split_scopes(raw);
    }
    if let Some(path) = &args.client_secret_file {
        config.client_secret = Some(read_secret_file(path)?);
    }

    if config.redirect_uri().is_none() {
        config.redirect_uri = Some(DEFAULT_REDIRECT_URI.to_owned());
    }
    if config.scopes.is_empty() {
        config.scopes = DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect();
    }
    Ok(())
}

fn read_secret_file(path: &Path) -> Result<String, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("client secret file read failed: {}: {e}", path.display()))?;
    let secret = raw.trim();
    if secret.is_empty() {
        return Err("client secret file is empty".to_owned());
    }
    Ok(secret.to_owned())
}

/// Prompt for whichever of client id and secret the config still lacks.
pub fn ensure_client_credentials(prompter: &dyn Prompter, config: &mut Config) -> Result<(), String> {
    if config.client_id().is_none() {
        let id = prompter.prompt("Client ID: ").map_err(|e| format!("client id required: {e}"))?;
        if id.trim().is_empty() {
            return Err("client id required".to_owned());
        }
        config.client_id = Some(id.trim().to_owned());
    }
    if config.client_secret().is_none() {
        let secret = prompter
            .prompt_secret("Client secret: ")
            .map_err(|e| format!("client secret required: {e}"))?;
        if secret.trim().is_empty() {
            return Err("client secret required".to_owned());
        }
        config.client_secret = Some(secret.trim().to_owned());
    }
    Ok(())
}

pub fn status(ctx: &Context) -> ExitCode {
    let loaded = match ctx.load_or_report() {
        Ok(l) => l,
        Err(code) => return code,
    };
    let config = &loaded.config;

    if ctx.printer.json {
        let body = status_summary(config).to_string();
        return match ctx.printer.print_json(&body) {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                ctx.printer.error(format_args!("output failed: {e}"));
                ExitCode::Failure
            }
        };
    }

    if config.access_token().is_none() {
        ctx.printer.info("not logged in");
        return ExitCode::Unauthenticated;
    }
    ctx.printer.info("logged in");
    print_status_details(&ctx.printer, config);
    ExitCode::Success
}

fn print_status_details(printer: &Printer, config: &Config) {
    if let Some(expires_at) = config.token.as_ref().and_then(|t| t.expires_at.as_deref()) {
        printer.info(format_args!("expires at {expires_at}"));
    }
    if !config.scopes.is_empty() {
        printer.info(format_args!("scopes: {}", config.scopes.join(" ")));
    }
    if let Some(id) = config.client_id() {
        printer.info(format_args!("client id: {id}"));
    }
    if let Some(uri) = config.redirect_uri() {
        printer.info(format_args!("redirect uri: {uri}"));
    }
}

/// Credential summary for `auth status --json`. Never includes secrets.
pub fn status_summary(config: &Config) -> serde_json::Value {
    let mut summary = json!({
        "client_id": config.client_id().unwrap_or_default(),
        "redirect_uri": config.redirect_uri().unwrap_or_default(),
        "scopes": config.scopes,
        "token_present": config.access_token().is_some(),
    });
    if let (Some(token), Some(map)) = (&config.token, summary.as_object_mut()) {
        if let Some(expires_at) = token.expires_at.as_deref().filter(|s| !s.is_empty()) {
            map.insert("expires_at".to_owned(), json!(expires_at));
        }
        if let Some(token_type) = token.token_type.as_deref().filter(|s| !s.is_empty()) {
            map.insert("token_type".to_owned(), json!(token_type));
        }
    }
    summary
}

pub fn logout(ctx: &Context) -> ExitCode {
    let path = match ctx.config_path() {
        Ok(p) => p,
        Err(e) => {
            ctx.printer.error(format_args!("config load failed: {e}"));
            return ExitCode::Failure;
        }
    };
    match remove_token(&FileStore::new(path)) {
        Ok(true) => {
            ctx.printer.info("logged out");
            ExitCode::Success
        }
        Ok(false) => {
            ctx.printer.info("no stored token");
            ExitCode::Success
        }
        Err(msg) => {
            ctx.printer.error(msg);
            ExitCode::Failure
        }
    }
}

/// Drop the token from the file as stored, without environment overrides.
/// `Ok(false)` when there was none.
pub fn remove_token(store: &dyn ConfigStore) -> Result<bool, String> {
    let mut config =
        store.load().map_err(|e| format!("config load failed: {e}"))?.unwrap_or_default();
    if !config.token.as_ref().is_some_and(|t| t.is_present()) {
        return Ok(false);
    }
    config.token = None;
    store.save(&config).map_err(|e| format!("config save failed: {e}"))?;
    Ok(true)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
