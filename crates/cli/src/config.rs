// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::client::API_BASE_URL;
use crate::oauth::{AUTHORIZE_URL, TOKEN_URL};

/// Command-line client for the Oura Ring API.
#[derive(Debug, Parser)]
#[command(name = "oura", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted before or after any subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Config file path [default: <user config dir>/oura/config.json].
    #[arg(long, global = true, env = "OURA_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP timeout (e.g. 30s, 500ms, 2m; bare numbers are seconds).
    #[arg(long, global = true, env = "OURA_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Print payloads as compact JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Never prompt; fail instead.
    #[arg(long, global = true, env = "OURA_NO_INPUT")]
    pub no_input: bool,

    /// Disable ANSI color in log output.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "OURA_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (text or json).
    #[arg(long, global = true, env = "OURA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    // -- Endpoint overrides (hidden; point tests at local servers) ----------
    #[arg(long, global = true, hide = true, env = "OURA_AUTHORIZE_URL", default_value = AUTHORIZE_URL)]
    pub authorize_url: String,

    #[arg(long, global = true, hide = true, env = "OURA_TOKEN_URL", default_value = TOKEN_URL)]
    pub token_url: String,

    #[arg(long, global = true, hide = true, env = "OURA_API_BASE_URL", default_value = API_BASE_URL)]
    pub api_base_url: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage OAuth credentials.
    Auth(AuthArgs),
    /// List documents of a resource.
    List(ListArgs),
    /// Fetch a single document.
    Get(GetArgs),
    /// Show the authenticated user's personal info.
    Whoami,
    /// Show supported resources and their filters.
    Resources,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize this client and store a token.
    Login(LoginArgs),
    /// Show the stored credential state.
    Status,
    /// Remove the stored token.
    Logout,
}

#[derive(Debug, Default, Args)]
pub struct LoginArgs {
    /// OAuth client id.
    #[arg(long)]
    pub client_id: Option<String>,

    /// File containing the OAuth client secret.
    #[arg(long)]
    pub client_secret_file: Option<PathBuf>,

    /// OAuth redirect URI [default: http://127.0.0.1:8797/callback].
    #[arg(long)]
    pub redirect_uri: Option<String>,

    /// Scopes, comma or space separated [default: daily].
    #[arg(long)]
    pub scopes: Option<String>,

    /// Print the authorization URL instead of opening a browser.
    #[arg(long)]
    pub no_open: bool,

    /// Paste the authorization code instead of running a local listener.
    #[arg(long)]
    pub paste: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource name (see `oura resources`).
    pub resource: String,

    /// Start date, YYYY-MM-DD.
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date, YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<String>,

    /// Start datetime, RFC 3339.
    #[arg(long)]
    pub start_datetime: Option<String>,

    /// End datetime, RFC 3339.
    #[arg(long)]
    pub end_datetime: Option<String>,

    /// Pagination token from a previous page.
    #[arg(long)]
    pub next_token: Option<String>,

    /// Query the sandbox dataset.
    #[arg(long)]
    pub sandbox: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Resource name (see `oura resources`).
    pub resource: String,

    /// Document id (not used for personal_info).
    pub document_id: Option<String>,

    /// Query the sandbox dataset.
    #[arg(long)]
    pub sandbox: bool,
}

impl Cli {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.global.validate()
    }
}

impl GlobalArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other} (expected text or json)"),
        }
        if self.timeout.is_zero() {
            anyhow::bail!("--timeout must be greater than zero");
        }
        if self.quiet && self.verbose {
            anyhow::bail!("--quiet and --verbose are mutually exclusive");
        }
        Ok(())
    }

    /// Effective log filter: `-v` raises it to debug, `-q` lowers it to error.
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            &self.log_level
        }
    }
}

/// Parse `30s`, `500ms`, `2m`, `1h`, or bare seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let n: u64 = digits.parse().map_err(|_| format!("invalid duration: {raw:?}"))?;
    let secs = |factor: u64| {
        n.checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("invalid duration: {raw:?}"))
    };
    match unit {
        "" | "s" => Ok(Duration::from_secs(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(format!("invalid duration unit in {raw:?} (use ms, s, m, or h)")),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
