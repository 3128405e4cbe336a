// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands: `auth`, `list`, `get`, `whoami`, `resources`.

pub mod auth;
pub mod fetch;
pub mod resources;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::build_http_client;
use crate::config::GlobalArgs;
use crate::error::ExitCode;
use crate::oauth::exchange::TokenExchanger;
use crate::output::Printer;
use crate::store::{self, Config, EnvOverrides, FileStore, StoreError};

/// Per-invocation state shared by every subcommand.
pub struct Context {
    pub global: GlobalArgs,
    pub printer: Printer,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

/// Config as loaded from disk with environment overrides applied.
pub struct Loaded {
    pub store: Arc<FileStore>,
    pub config: Config,
    pub overrides: EnvOverrides,
}

impl Context {
    pub fn new(global: GlobalArgs, printer: Printer) -> Self {
        Self { global, printer, cancel: CancellationToken::new() }
    }

    pub fn config_path(&self) -> Result<PathBuf, StoreError> {
        match &self.global.config {
            Some(path) => Ok(path.clone()),
            None => store::default_path(),
        }
    }

    pub fn load(&self) -> Result<Loaded, StoreError> {
        let store = FileStore::new(self.config_path()?);
        let mut config = store.load_or_default()?;
        let overrides = store::apply_env(&mut config);
        Ok(Loaded { store: Arc::new(store), config, overrides })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        build_http_client(self.global.timeout)
    }

    pub fn exchanger(&self, http: reqwest::Client) -> TokenExchanger {
        TokenExchanger::new(http, self.global.token_url.clone())
    }

    /// Load the config or report the failure.
    pub(crate) fn load_or_report(&self) -> Result<Loaded, ExitCode> {
        self.load().map_err(|e| {
            self.printer.error(format_args!("config load failed: {e}"));
            ExitCode::Failure
        })
    }
}
