// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted client configuration and OAuth token.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variables consulted by [`apply_env`].
pub const ENV_CLIENT_ID: &str = "OURA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "OURA_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "OURA_REDIRECT_URI";
pub const ENV_SCOPES: &str = "OURA_SCOPES";
pub const ENV_ACCESS_TOKEN: &str = "OURA_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "OURA_REFRESH_TOKEN";

/// Stored OAuth token. `expires_at` is an RFC 3339 UTC timestamp.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Token {
    pub fn is_present(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        non_empty(&self.refresh_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &self.refresh_token().map(redact))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Client registration plus the current token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
}

impl Config {
    pub fn client_id(&self) -> Option<&str> {
        non_empty(&self.client_id)
    }

    pub fn client_secret(&self) -> Option<&str> {
        non_empty(&self.client_secret)
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        non_empty(&self.redirect_uri)
    }

    /// Access token if one is stored and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().filter(|t| t.is_present()).map(|t| t.access_token.as_str())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret().map(redact))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("token", &self.token)
            .finish()
    }
}

/// Which fields were supplied by the environment rather than the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub client_id: bool,
    pub client_secret: bool,
    pub redirect_uri: bool,
    pub scopes: bool,
    pub access_token: bool,
    pub refresh_token: bool,
}

impl EnvOverrides {
    /// A refreshed token may be written back only when neither token came
    /// from the environment.
    pub fn persist_allowed(&self) -> bool {
        !(self.access_token || self.refresh_token)
    }
}

/// Apply `OURA_*` overrides from the process environment.
pub fn apply_env(config: &mut Config) -> EnvOverrides {
    apply_env_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup. Empty values are ignored.
pub fn apply_env_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) -> EnvOverrides {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
    let mut overrides = EnvOverrides::default();

    if let Some(v) = get(ENV_CLIENT_ID) {
        config.client_id = Some(v);
        overrides.client_id = true;
    }
    if let Some(v) = get(ENV_CLIENT_SECRET) {
        config.client_secret = Some(v);
        overrides.client_secret = true;
    }
    if let Some(v) = get(ENV_REDIRECT_URI) {
        config.redirect_uri = Some(v);
        overrides.redirect_uri = true;
    }
    if let Some(v) = get(ENV_SCOPES) {
        config.scopes = split_scopes(&v);
        overrides.scopes = true;
    }
    if let Some(v) = get(ENV_ACCESS_TOKEN) {
        config.token.get_or_insert_with(Token::default).access_token = v;
        overrides.access_token = true;
    }
    if let Some(v) = get(ENV_REFRESH_TOKEN) {
        config.token.get_or_insert_with(Token::default).refresh_token = Some(v);
        overrides.refresh_token = true;
    }
    overrides
}

/// Split a scope list on commas and whitespace, dropping duplicates.
pub fn split_scopes(raw: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for scope in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if !scope.is_empty() && !scopes.iter().any(|s| s == scope) {
            scopes.push(scope.to_owned());
        }
    }
    scopes
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no user config directory; pass --config")]
    NoConfigDir,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: invalid config: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<user config dir>/oura/config.json`.
pub fn default_path() -> Result<PathBuf, StoreError> {
    let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
    Ok(dir.join("oura").join("config.json"))
}

/// Load/save seam for [`Config`].
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Config>, StoreError>;

    fn save(&self, config: &Config) -> Result<(), StoreError>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, falling back to the default when the file is absent.
    pub fn load_or_default(&self) -> Result<Config, StoreError> {
        Ok(self.load()?.unwrap_or_default())
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<Option<Config>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let config = serde_json::from_str(&contents)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;
        Ok(Some(config))
    }

    /// Write atomically: a uniquely named temp file in the same directory,
    /// then rename over the target. The file is created owner-only.
    fn save(&self, config: &Config) -> Result<(), StoreError> {
        use std::io::Write;
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_private_dir(dir).map_err(|e| self.io_err(e))?;
        }

        let mut json = serde_json::to_string_pretty(config)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;
        json.push('\n');

        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);

        let written = open_private(&tmp_path).and_then(|mut f| {
            f.write_all(json.as_bytes())?;
            f.sync_all()
        });
        if let Err(e) = written.and_then(|()| std::fs::rename(&tmp_path, &self.path)) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(self.io_err(e));
        }
        Ok(())
    }
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "[redacted]"
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
