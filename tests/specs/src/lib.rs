// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Runs the real `oura` binary against a throwaway config file and, where a
//! test needs one, local mock OAuth and API servers.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::{Child, Command};

pub use oura::store::{Config, Token};
pub use oura::test_support::{free_port, ScriptedServer};

use oura::store::{ConfigStore, FileStore};

/// Environment variables the binary reads; cleared so the host can't leak in.
const OURA_ENV: &[&str] = &[
    "OURA_CONFIG",
    "OURA_TIMEOUT",
    "OURA_NO_INPUT",
    "OURA_LOG_LEVEL",
    "OURA_LOG_FORMAT",
    "OURA_AUTHORIZE_URL",
    "OURA_TOKEN_URL",
    "OURA_API_BASE_URL",
    "OURA_CLIENT_ID",
    "OURA_CLIENT_SECRET",
    "OURA_REDIRECT_URI",
    "OURA_SCOPES",
    "OURA_ACCESS_TOKEN",
    "OURA_REFRESH_TOKEN",
];

/// Resolve the path to the compiled `oura` binary.
pub fn oura_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("oura")
}

/// A scratch config directory plus the endpoints the binary should talk to.
pub struct Sandbox {
    dir: tempfile::TempDir,
    api_base_url: Option<String>,
    token_url: Option<String>,
    env: Vec<(String, String)>,
}

impl Sandbox {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { dir: tempfile::tempdir()?, api_base_url: None, token_url: None, env: Vec::new() })
    }

    pub fn api(mut self, server: &ScriptedServer) -> Self {
        self.api_base_url = Some(server.url(""));
        self
    }

    pub fn tokens(mut self, server: &ScriptedServer) -> Self {
        self.token_url = Some(server.url("/oauth/token"));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, config: &Config) -> anyhow::Result<()> {
        FileStore::new(self.config_path()).save(config)?;
        Ok(())
    }

    pub fn read_config(&self) -> anyhow::Result<Option<Config>> {
        Ok(FileStore::new(self.config_path()).load()?)
    }

    /// Build the command without running it.
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(oura_binary());
        for key in OURA_ENV {
            cmd.env_remove(key);
        }
        cmd.env_remove("NO_COLOR");
        cmd.env("OURA_CONFIG", self.config_path());
        if let Some(url) = &self.api_base_url {
            cmd.env("OURA_API_BASE_URL", url);
        }
        if let Some(url) = &self.token_url {
            cmd.env("OURA_TOKEN_URL", url);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Run to completion, capturing stdout and stderr.
    pub async fn run(&self, args: &[&str]) -> anyhow::Result<Run> {
        let output = self.command(args).stdout(Stdio::piped()).stderr(Stdio::piped()).output().await?;
        Ok(Run::from(output))
    }

    /// Start without waiting; stderr is piped for the caller to read.
    pub fn spawn(&self, args: &[&str]) -> anyhow::Result<Child> {
        Ok(self.command(args).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?)
    }
}

/// Captured result of one invocation.
#[derive(Debug)]
pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for Run {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Run {
    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::from_str(self.stdout.trim())?)
    }
}

/// A config with client credentials and an access token.
pub fn logged_in(access_token: &str, refresh_token: Option<&str>) -> Config {
    Config {
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        token: Some(Token {
            access_token: access_token.to_owned(),
            refresh_token: refresh_token.map(str::to_owned),
            ..Token::default()
        }),
        ..Config::default()
    }
}
