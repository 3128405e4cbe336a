// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive line prompts on the controlling terminal.

use std::io::{BufRead, IsTerminal, Write};

use nix::sys::termios;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("input disabled")]
    Disabled,
    #[error("stdin is not a tty")]
    NotInteractive,
    #[error("input closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    /// Ask for a line of input. The answer is trimmed.
    fn prompt(&self, label: &str) -> Result<String, PromptError>;

    /// Ask for a line without echoing it.
    fn prompt_secret(&self, label: &str) -> Result<String, PromptError>;
}

/// Prompts on stderr and reads stdin. Refuses when input is disabled or
/// stdin is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    no_input: bool,
}

impl TerminalPrompter {
    pub fn new(no_input: bool) -> Self {
        Self { no_input }
    }

    fn ensure_interactive(&self) -> Result<(), PromptError> {
        if self.no_input {
            return Err(PromptError::Disabled);
        }
        if !std::io::stdin().is_terminal() {
            return Err(PromptError::NotInteractive);
        }
        Ok(())
    }
}

impl Prompter for TerminalPrompter {
    fn prompt(&self, label: &str) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        write_label(label)?;
        read_line()
    }

    fn prompt_secret(&self, label: &str) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        write_label(label)?;
        let answer = {
            let _echo = EchoGuard::disable()?;
            read_line()
        };
        // The newline typed by the user was not echoed.
        eprintln!();
        answer
    }
}

fn write_label(label: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    stderr.write_all(label.as_bytes())?;
    stderr.flush()
}

fn read_line() -> Result<String, PromptError> {
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(PromptError::Closed);
    }
    Ok(line.trim().to_owned())
}

/// Turns terminal echo off until dropped.
struct EchoGuard {
    original: termios::Termios,
}

impl EchoGuard {
    fn disable() -> std::io::Result<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut silent = original.clone();
        silent.local_flags.remove(termios::LocalFlags::ECHO);
        termios::tcsetattr(&stdin, termios::SetArg::TCSAFLUSH, &silent)?;
        Ok(Self { original })
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(std::io::stdin(), termios::SetArg::TCSAFLUSH, &self.original);
    }
}
