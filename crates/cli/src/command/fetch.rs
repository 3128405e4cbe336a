// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oura list`, `oura get`, and `oura whoami`.

use std::collections::BTreeMap;

use super::Context;
use crate::client::{ApiClient, ClientError, Response};
use crate::config::{GetArgs, ListArgs};
use crate::error::ExitCode;
use crate::output::Printer;
use crate::resource::{self, ListFilters, Resource, PERSONAL_INFO};

pub async fn list(ctx: &Context, args: &ListArgs) -> ExitCode {
    let resource = match lookup(&ctx.printer, &args.resource) {
        Ok(r) => r,
        Err(code) => return code,
    };
    if !resource.supports_list {
        ctx.printer.error(format_args!("resource is not listable: {}", resource.key));
        return ExitCode::Usage;
    }

    let filters = ListFilters {
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
        start_datetime: args.start_datetime.clone(),
        end_datetime: args.end_datetime.clone(),
        next_token: args.next_token.clone(),
    };
    let query = match resource::build_list_query(resource, &filters) {
        Ok(q) => q,
        Err(e) => {
            ctx.printer.error(format_args!("invalid query: {e}"));
            return ExitCode::Usage;
        }
    };

    let path = resource::collection_path(args.sandbox, resource.path_segment);
    fetch(ctx, &path, &query).await
}

pub async fn get(ctx: &Context, args: &GetArgs) -> ExitCode {
    let resource = match lookup(&ctx.printer, &args.resource) {
        Ok(r) => r,
        Err(code) => return code,
    };
    if !resource.supports_get {
        ctx.printer.error(format_args!("resource is not fetchable: {}", resource.key));
        return ExitCode::Usage;
    }

    let path = match (resource.key, args.document_id.as_deref()) {
        (PERSONAL_INFO, None) => resource::collection_path(args.sandbox, resource.path_segment),
        (PERSONAL_INFO, Some(_)) => {
            ctx.printer.error("personal_info does not accept a document_id");
            return ExitCode::Usage;
        }
        (key, None) => {
            ctx.printer.error(format_args!("document_id required for {key}"));
            return ExitCode::Usage;
        }
        (_, Some(id)) => resource::document_path(args.sandbox, resource.path_segment, id),
    };
    fetch(ctx, &path, &BTreeMap::new()).await
}

pub async fn whoami(ctx: &Context) -> ExitCode {
    let path = resource::collection_path(false, PERSONAL_INFO);
    fetch(ctx, &path, &BTreeMap::new()).await
}

fn lookup(printer: &Printer, name: &str) -> Result<&'static Resource, ExitCode> {
    resource::lookup(name).ok_or_else(|| {
        printer.error(format_args!("unknown resource: {name}"));
        ExitCode::Usage
    })
}

async fn fetch(ctx: &Context, path: &str, query: &BTreeMap<String, String>) -> ExitCode {
    let loaded = match ctx.load_or_report() {
        Ok(l) => l,
        Err(code) => return code,
    };
    if loaded.config.access_token().is_none() {
        ctx.printer.error(format_args!("auth required: {}", ClientError::Unauthenticated));
        return ExitCode::Unauthenticated;
    }
    let http = match ctx.http_client() {
        Ok(h) => h,
        Err(e) => {
            ctx.printer.error(format_args!("http client setup failed: {e}"));
            return ExitCode::Failure;
        }
    };

    let mut client = ApiClient::new(
        http.clone(),
        ctx.global.api_base_url.clone(),
        ctx.exchanger(http),
        loaded.config,
        loaded.store,
        loaded.overrides,
    );
    let result = tokio::select! {
        r = client.get(path, query) => r,
        _ = ctx.cancel.cancelled() => {
            ctx.printer.error("request cancelled");
            return ExitCode::Failure;
        }
    };

    match result {
        Ok(resp) => report(&ctx.printer, &resp),
        Err(e @ (ClientError::Unauthenticated | ClientError::MissingClientCredentials)) => {
            ctx.printer.error(format_args!("auth required: {e}"));
            e.kind().exit_code()
        }
        Err(e) => {
            ctx.printer.error(&e);
            e.kind().exit_code()
        }
    }
}

/// Print a successful payload, or the API error line for a failed one.
pub fn report(printer: &Printer, resp: &Response) -> ExitCode {
    if resp.status >= 400 {
        printer.error(format_args!("api error ({}): {}", resp.status, api_error_message(&resp.body)));
        return ExitCode::from_http_status(resp.status);
    }
    match printer.print_json(&resp.body) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            printer.error(format_args!("output failed: {e}"));
            ExitCode::Failure
        }
    }
}

/// The body's `message` or `error` string, else the trimmed body.
pub fn api_error_message(body: &str) -> String {
    let text = body.trim();
    if let Ok(serde_json::Value::Object(payload)) = serde_json::from_str(text) {
        for key in ["message", "error"] {
            if let Some(msg) = payload.get(key).and_then(|v| v.as_str()).filter(|m| !m.is_empty()) {
                return msg.to_owned();
            }
        }
    }
    text.to_owned()
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
