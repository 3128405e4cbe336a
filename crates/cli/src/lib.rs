// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod oauth;
pub mod output;
pub mod prompt;
pub mod resource;
pub mod store;
pub mod test_support;

use tracing::debug;

use crate::command::Context;
use crate::config::{AuthCommand, Cli, Command};
use crate::error::ExitCode;
use crate::output::Printer;

/// Dispatch a parsed command line. Ctrl-C cancels any in-flight login or
/// request.
pub async fn run(cli: Cli) -> ExitCode {
    let printer = Printer::for_terminal(cli.global.quiet, cli.global.json);
    let ctx = Context::new(cli.global, printer);

    let cancel = ctx.cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            cancel.cancel();
        }
    });

    let code = match &cli.command {
        Command::Auth(auth) => match &auth.command {
            AuthCommand::Login(args) => command::auth::login(&ctx, args).await,
            AuthCommand::Status => command::auth::status(&ctx),
            AuthCommand::Logout => command::auth::logout(&ctx),
        },
        Command::List(args) => command::fetch::list(&ctx, args).await,
        Command::Get(args) => command::fetch::get(&ctx, args).await,
        Command::Whoami => command::fetch::whoami(&ctx).await,
        Command::Resources => command::resources::run(&ctx.printer),
    };
    watcher.abort();
    debug!(exit = %code, "done");
    code
}
