// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::client::build_http_client;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

async fn start(state: &str) -> anyhow::Result<(LoopbackServer, reqwest::Client)> {
    let redirect = url::Url::parse("http://127.0.0.1:0/callback")?;
    let server = LoopbackServer::bind(&redirect, state).await?;
    Ok((server, build_http_client(Duration::from_secs(5))?))
}

async fn hit(
    http: &reqwest::Client,
    addr: SocketAddr,
    path_and_query: &str,
) -> anyhow::Result<(u16, String)> {
    let resp = http.get(format!("http://{addr}{path_and_query}")).send().await?;
    let status = resp.status().as_u16();
    Ok((status, resp.text().await?))
}

#[yare::parameterized(
    matching_state = { &[("code", "XYZ"), ("state", "S1")], "S1", Some("XYZ") },
    no_expected_state = { &[("code", "XYZ")], "", Some("XYZ") },
    wrong_state = { &[("code", "XYZ"), ("state", "S2")], "S1", None },
    missing_state = { &[("code", "XYZ")], "S1", None },
    empty_code = { &[("code", ""), ("state", "S1")], "S1", None },
    error_param = { &[("error", "access_denied"), ("code", "XYZ"), ("state", "S1")], "S1", None },
)]
fn callback_classification(query: &[(&str, &str)], expected_state: &str, code: Option<&str>) {
    let outcome = evaluate_callback(&params(query), expected_state);
    assert_eq!(outcome.ok().as_deref(), code);
}

#[test]
fn error_param_wins_over_state_mismatch() {
    let outcome = evaluate_callback(&params(&[("error", "access_denied"), ("state", "nope")]), "S1");
    assert!(matches!(outcome, Err(AuthError::Authorization(ref r)) if r == "access_denied"));
}

#[tokio::test]
async fn resolves_with_code_when_state_matches() -> anyhow::Result<()> {
    let (server, http) = start("S1").await?;
    let addr = server.local_addr();

    let (status, body) = hit(&http, addr, "/callback?code=XYZ&state=S1").await?;
    assert_eq!(status, 200);
    assert!(body.starts_with("Authorization complete."));

    assert_eq!(server.wait(CancellationToken::new()).await?, "XYZ");
    Ok(())
}

#[tokio::test]
async fn state_mismatch_answers_400_and_resolves_error() -> anyhow::Result<()> {
    let (server, http) = start("S1").await?;
    let addr = server.local_addr();

    let (status, body) = hit(&http, addr, "/callback?code=XYZ&state=S2").await?;
    assert_eq!(status, 400);
    assert_eq!(body, "state mismatch");

    let err = server.wait(CancellationToken::new()).await;
    assert!(matches!(err, Err(AuthError::StateMismatch)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn provider_error_answers_authorization_failed() -> anyhow::Result<()> {
    let (server, http) = start("S1").await?;
    let addr = server.local_addr();

    let (status, body) = hit(&http, addr, "/callback?error=access_denied&state=S1").await?;
    assert_eq!((status, body.as_str()), (400, "authorization failed"));

    let err = server.wait(CancellationToken::new()).await;
    assert!(matches!(err, Err(AuthError::Authorization(_))), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn first_resolution_wins() -> anyhow::Result<()> {
    let (server, http) = start("S1").await?;
    let addr = server.local_addr();

    let (first, _) = hit(&http, addr, "/callback?code=XYZ&state=S1").await?;
    let (second, body) = hit(&http, addr, "/callback?code=OTHER&state=S2").await?;
    let (third, _) = hit(&http, addr, "/callback?code=LATE&state=S1").await?;
    assert_eq!(first, 200);
    assert_eq!((second, body.as_str()), (400, "state mismatch"));
    assert_eq!(third, 200);

    assert_eq!(server.wait(CancellationToken::new()).await?, "XYZ");
    Ok(())
}

#[tokio::test]
async fn other_paths_do_not_resolve() -> anyhow::Result<()> {
    let (server, http) = start("S1").await?;
    let addr = server.local_addr();

    let (status, _) = hit(&http, addr, "/favicon.ico").await?;
    assert_eq!(status, 404);
    hit(&http, addr, "/callback?code=XYZ&state=S1").await?;

    assert_eq!(server.wait(CancellationToken::new()).await?, "XYZ");
    Ok(())
}

#[tokio::test]
async fn route_syntax_in_callback_path_is_served_literally() -> anyhow::Result<()> {
    let redirect = crate::oauth::validate_loopback_redirect("http://127.0.0.1:0/:cb")?;
    let server = LoopbackServer::bind(&redirect, "S1").await?;
    let http = build_http_client(Duration::from_secs(5))?;
    let addr = server.local_addr();

    let (status, _) = hit(&http, addr, "/other?code=XYZ&state=S1").await?;
    assert_eq!(status, 404);
    let (status, _) = hit(&http, addr, "/:cb?code=XYZ&state=S1").await?;
    assert_eq!(status, 200);

    assert_eq!(server.wait(CancellationToken::new()).await?, "XYZ");
    Ok(())
}

#[tokio::test]
async fn cancellation_reports_timeout_and_frees_port() -> anyhow::Result<()> {
    let (server, _) = start("S1").await?;
    let addr = server.local_addr();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = server.wait(cancel).await;
    assert!(matches!(err, Err(AuthError::Timeout)), "got {err:?}");

    let rebound = TcpListener::bind(addr).await;
    assert!(rebound.is_ok(), "port {addr} still held");
    Ok(())
}

#[tokio::test]
async fn occupied_port_is_bind_error() -> anyhow::Result<()> {
    let held = TcpListener::bind("127.0.0.1:0").await?;
    let port = held.local_addr()?.port();
    let redirect = url::Url::parse(&format!("http://127.0.0.1:{port}/callback"))?;

    let err = LoopbackServer::bind(&redirect, "S1").await.err();
    assert!(matches!(err, Some(AuthError::Bind { .. })), "got {err:?}");
    assert!(err.is_some_and(|e| e.suggests_paste()));
    Ok(())
}
