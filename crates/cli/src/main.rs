// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use oura::config::{Cli, GlobalArgs};
use oura::error::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("error: {e}");
        std::process::exit(ExitCode::Usage.code());
    }

    init_tracing(&cli.global);

    let code = oura::run(cli).await;
    std::process::exit(code.code());
}

fn init_tracing(global: &GlobalArgs) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(global.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!global.no_color);

    match global.log_format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}
