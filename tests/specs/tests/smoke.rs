// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that run the real `oura` binary against mock
//! OAuth and API servers.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::ChildStderr;

use oura_specs::{free_port, logged_in, Sandbox, ScriptedServer};

const TIMEOUT: Duration = Duration::from_secs(10);

fn script(entries: &[(u16, &str)]) -> Vec<(u16, String)> {
    entries.iter().map(|(s, b)| (*s, (*b).to_owned())).collect()
}

/// First line of output that looks like a URL.
async fn first_url(lines: &mut Lines<BufReader<ChildStderr>>) -> anyhow::Result<String> {
    while let Some(line) = lines.next_line().await? {
        if line.starts_with("http") {
            return Ok(line);
        }
    }
    anyhow::bail!("authorization url never printed")
}

// -- Offline commands ---------------------------------------------------------

#[tokio::test]
async fn resources_json_lists_table() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    let run = sb.run(&["resources", "--json"]).await?;
    assert_eq!(run.code, Some(0), "{run:?}");

    let entries = run.json()?;
    let names: Vec<&str> =
        entries.as_array().into_iter().flatten().filter_map(|e| e["name"].as_str()).collect();
    assert_eq!(names.len(), 18);
    assert!(names.contains(&"heartrate"));
    assert!(names.contains(&"vo2_max"));
    Ok(())
}

#[tokio::test]
async fn invalid_global_flags_exit_usage() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    let run = sb.run(&["--log-format", "xml", "resources"]).await?;
    assert_eq!(run.code, Some(2));
    assert!(run.stderr.contains("invalid log format"), "{}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn list_without_token_exits_unauthenticated() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    let run = sb.run(&["list", "daily_sleep"]).await?;
    assert_eq!(run.code, Some(3));
    assert!(run.stderr.contains("auth required"), "{}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn wrong_filter_kind_exits_usage_without_network() -> anyhow::Result<()> {
    let api = ScriptedServer::start(script(&[(200, "{}")])).await?;
    let sb = Sandbox::new()?.api(&api);
    sb.write_config(&logged_in("A", None))?;

    let run = sb
        .run(&["list", "ring_configuration", "--start-date", "2024-01-01", "--end-date", "2024-01-02"])
        .await?;
    assert_eq!(run.code, Some(2));
    assert!(run.stderr.contains("invalid query"), "{}", run.stderr);
    assert_eq!(api.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn auth_status_reports_login_state() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    assert_eq!(sb.run(&["auth", "status"]).await?.code, Some(3));

    let run = sb.run(&["auth", "status", "--json"]).await?;
    assert_eq!(run.code, Some(0));
    assert_eq!(run.json()?["token_present"], false);

    sb.write_config(&logged_in("A", Some("R")))?;
    let run = sb.run(&["auth", "status"]).await?;
    assert_eq!(run.code, Some(0));
    assert!(run.stderr.contains("logged in"), "{}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn logout_removes_token() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    sb.write_config(&logged_in("A", Some("R")))?;

    let run = sb.run(&["auth", "logout"]).await?;
    assert_eq!(run.code, Some(0));
    let config = sb.read_config()?.unwrap_or_default();
    assert!(config.token.is_none());
    assert_eq!(config.client_id.as_deref(), Some("client"));

    let run = sb.run(&["auth", "logout"]).await?;
    assert!(run.stderr.contains("no stored token"), "{}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn paste_login_without_input_exits_usage() -> anyhow::Result<()> {
    let sb = Sandbox::new()?;
    let run = sb
        .run(&["auth", "login", "--paste", "--no-input", "--client-id", "client"])
        .await?;
    assert_eq!(run.code, Some(2));
    assert!(run.stderr.contains("client secret required"), "{}", run.stderr);
    Ok(())
}

// -- API calls ----------------------------------------------------------------

#[tokio::test]
async fn list_refreshes_expired_token_and_persists_it() -> anyhow::Result<()> {
    let api = ScriptedServer::start(script(&[(401, "expired"), (200, r#"{"data":[],"next_token":null}"#)]))
        .await?;
    let tokens = ScriptedServer::start(script(&[(
        200,
        r#"{"access_token":"B","refresh_token":"R2","expires_in":3600,"token_type":"Bearer"}"#,
    )]))
    .await?;
    let sb = Sandbox::new()?.api(&api).tokens(&tokens);
    sb.write_config(&logged_in("A", Some("R1")))?;

    let run = sb
        .run(&["--json", "list", "daily_sleep", "--start-date", "2024-01-01", "--end-date", "2024-01-02"])
        .await?;
    assert_eq!(run.code, Some(0), "{run:?}");
    assert_eq!(run.stdout.trim(), r#"{"data":[],"next_token":null}"#);

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer B"));
    assert!(tokens.requests()[0].body.contains("grant_type=refresh_token"));

    let token = sb.read_config()?.and_then(|c| c.token).unwrap_or_default();
    assert_eq!(token.access_token, "B");
    assert_eq!(token.refresh_token.as_deref(), Some("R2"));
    assert!(token.expires_at.is_some());
    Ok(())
}

#[tokio::test]
async fn env_token_refresh_is_not_persisted() -> anyhow::Result<()> {
    let api = ScriptedServer::start(script(&[(401, "expired"), (200, "{}")])).await?;
    let tokens =
        ScriptedServer::start(script(&[(200, r#"{"access_token":"B","expires_in":60}"#)])).await?;
    let sb = Sandbox::new()?
        .api(&api)
        .tokens(&tokens)
        .env("OURA_ACCESS_TOKEN", "ENV")
        .env("OURA_REFRESH_TOKEN", "ENV-R");
    sb.write_config(&logged_in("A", Some("R1")))?;

    let run = sb.run(&["whoami"]).await?;
    assert_eq!(run.code, Some(0), "{run:?}");
    assert_eq!(api.requests()[0].authorization.as_deref(), Some("Bearer ENV"));

    let token = sb.read_config()?.and_then(|c| c.token).unwrap_or_default();
    assert_eq!(token.access_token, "A");
    Ok(())
}

#[tokio::test]
async fn api_errors_map_to_exit_codes() -> anyhow::Result<()> {
    let api = ScriptedServer::start(script(&[(429, r#"{"message":"slow down"}"#)])).await?;
    let sb = Sandbox::new()?.api(&api);
    sb.write_config(&logged_in("A", None))?;

    let run = sb.run(&["get", "workout", "w1"]).await?;
    assert_eq!(run.code, Some(5));
    assert!(run.stderr.contains("api error (429): slow down"), "{}", run.stderr);
    Ok(())
}

// -- Loopback login -----------------------------------------------------------

#[tokio::test]
async fn loopback_login_stores_token() -> anyhow::Result<()> {
    let tokens = ScriptedServer::start(script(&[(
        200,
        r#"{"access_token":"A1","refresh_token":"R1","expires_in":3600,"token_type":"Bearer"}"#,
    )]))
    .await?;
    let sb = Sandbox::new()?.tokens(&tokens);
    let secret_file = sb.dir().join("secret");
    std::fs::write(&secret_file, "secret\n")?;
    let redirect = format!("http://127.0.0.1:{}/callback", free_port()?);
    let secret_arg = secret_file.display().to_string();

    let mut child = sb.spawn(&[
        "auth",
        "login",
        "--no-open",
        "--client-id",
        "client",
        "--client-secret-file",
        &secret_arg,
        "--redirect-uri",
        &redirect,
    ])?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow::anyhow!("stderr not piped"))?;
    let mut lines = BufReader::new(stderr).lines();

    let auth_url = tokio::time::timeout(TIMEOUT, first_url(&mut lines)).await??;
    let state = reqwest::Url::parse(&auth_url)?
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("state missing from {auth_url}"))?;

    let http = oura::client::build_http_client(TIMEOUT)?;
    let resp = http.get(format!("{redirect}?code=the-code&state={state}")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);

    let status = tokio::time::timeout(TIMEOUT, child.wait()).await??;
    assert_eq!(status.code(), Some(0));

    let body = &tokens.requests()[0].body;
    assert!(body.contains("grant_type=authorization_code"), "{body}");
    assert!(body.contains("code=the-code"), "{body}");

    let config = sb.read_config()?.unwrap_or_default();
    assert_eq!(config.access_token(), Some("A1"));
    assert_eq!(config.redirect_uri(), Some(redirect.as_str()));
    assert_eq!(config.scopes, vec!["daily".to_owned()]);
    Ok(())
}
