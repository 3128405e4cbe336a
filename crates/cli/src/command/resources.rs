// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oura resources` subcommand.

use serde::Serialize;

use crate::error::ExitCode;
use crate::output::Printer;
use crate::resource::{self, Resource};

#[derive(Serialize)]
struct Entry {
    name: &'static str,
    list: bool,
    get: bool,
    query: &'static str,
    path: &'static str,
}

impl From<&Resource> for Entry {
    fn from(r: &Resource) -> Self {
        Self {
            name: r.key,
            list: r.supports_list,
            get: r.supports_get,
            query: r.query.label(),
            path: r.path_segment,
        }
    }
}

/// One `name (query label)` line per resource, sorted.
pub fn render_text() -> String {
    let mut out = String::new();
    for r in resource::all() {
        out.push_str(&format!("{} ({})\n", r.key, r.query.label()));
    }
    out
}

pub fn render_json() -> Result<String, serde_json::Error> {
    let entries: Vec<Entry> = resource::all().into_iter().map(Entry::from).collect();
    serde_json::to_string(&entries)
}

pub fn run(printer: &Printer) -> ExitCode {
    let written = if printer.json {
        match render_json() {
            Ok(body) => printer.print_json(&body),
            Err(e) => {
                printer.error(format_args!("json encode failed: {e}"));
                return ExitCode::Failure;
            }
        }
    } else {
        printer.write(&render_text())
    };
    match written {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            printer.error(format_args!("output failed: {e}"));
            ExitCode::Failure
        }
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
