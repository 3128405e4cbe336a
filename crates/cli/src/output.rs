// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal output: payloads to stdout, diagnostics to stderr.

use std::fmt::Display;
use std::io::{IsTerminal, Write};

/// How payloads and diagnostics are written for one invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    pub quiet: bool,
    /// `--json`: payloads printed compact on one line.
    pub json: bool,
    /// Re-indent JSON payloads for a human reader.
    pub pretty: bool,
}

impl Printer {
    pub fn new(quiet: bool, json: bool, pretty: bool) -> Self {
        Self { quiet, json, pretty }
    }

    /// Pretty output only when stdout is a terminal and `--json` is off.
    pub fn for_terminal(quiet: bool, json: bool) -> Self {
        Self::new(quiet, json, !json && std::io::stdout().is_terminal())
    }

    /// Informational line on stderr, suppressed by `--quiet`.
    pub fn info(&self, msg: impl Display) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }

    /// Error line on stderr, never suppressed.
    pub fn error(&self, msg: impl Display) {
        eprintln!("{msg}");
    }

    /// Raw text on stdout.
    pub fn write(&self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    /// A JSON payload on stdout, followed by a newline.
    pub fn print_json(&self, body: &str) -> std::io::Result<()> {
        let mut rendered = self.render_json(body);
        rendered.push('\n');
        self.write(&rendered)
    }

    /// Trimmed body, re-indented with two spaces when pretty. Bodies that
    /// are not valid JSON pass through trimmed.
    pub fn render_json(&self, body: &str) -> String {
        let trimmed = body.trim();
        if self.pretty && !self.json {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                if let Ok(indented) = serde_json::to_string_pretty(&value) {
                    return indented;
                }
            }
        }
        trimmed.to_owned()
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
