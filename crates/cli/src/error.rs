// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process exit codes shared by every `oura` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitCode {
    Success,
    Failure,
    Usage,
    Unauthenticated,
    Network,
    RateLimited,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
            Self::Unauthenticated => 3,
            Self::Network => 4,
            Self::RateLimited => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Usage => "USAGE",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Network => "NETWORK",
            Self::RateLimited => "RATE_LIMITED",
        }
    }

    /// Exit code for an API response with the given HTTP status.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::Usage,
            401 => Self::Unauthenticated,
            429 => Self::RateLimited,
            s if s >= 400 => Self::Failure,
            _ => Self::Success,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classes of the auth and client layers.
///
/// Component errors report their class through `kind()`; commands turn the
/// class into an [`ExitCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input, including a callback state mismatch.
    Validation,
    /// The loopback port could not be bound.
    Bind,
    /// The provider could not be reached.
    Transport,
    /// The provider answered with a non-2xx status.
    Provider,
    /// The config store could not be written.
    Persistence,
    /// The login deadline expired or the caller cancelled.
    Timeout,
    /// No access token is available.
    Unauthenticated,
}

impl ErrorKind {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation => ExitCode::Usage,
            Self::Bind => ExitCode::Failure,
            Self::Transport => ExitCode::Network,
            Self::Provider => ExitCode::Failure,
            Self::Persistence => ExitCode::Failure,
            Self::Timeout => ExitCode::Failure,
            Self::Unauthenticated => ExitCode::Unauthenticated,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
