//! Route registration tests.
//!
//! Sync routes exist only for providers whose credential group is complete,
//! and the secret variants only when a shared secret is configured. A route
//! that is registered answers 401 without credentials; one that is not
//! answers 404.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use ug_test_utils::TestGatewayServer;

const ROUTES: [&str; 4] = [
    "/api/gitlab/sync/jwt",
    "/api/gitlab/sync/secret",
    "/api/github/sync/jwt",
    "/api/github/sync/secret",
];

/// Status of an unauthenticated POST to each of [`ROUTES`].
async fn route_statuses(server: &TestGatewayServer) -> Result<Vec<u16>> {
    let client = reqwest::Client::new();
    let mut statuses = Vec::with_capacity(ROUTES.len());
    for route in ROUTES {
        let response = client
            .post(format!("{}{}?image=app:1", server.url(), route))
            .send()
            .await?;
        statuses.push(response.status().as_u16());
    }
    Ok(statuses)
}

#[tokio::test]
async fn test_no_providers_registers_no_sync_routes() -> Result<()> {
    let server = TestGatewayServer::builder().with_shared_secret().spawn().await?;

    assert_eq!(route_statuses(&server).await?, vec![404, 404, 404, 404]);

    Ok(())
}

#[tokio::test]
async fn test_gitlab_only() -> Result<()> {
    let server = TestGatewayServer::builder().with_gitlab().spawn().await?;

    assert_eq!(route_statuses(&server).await?, vec![401, 404, 404, 404]);

    Ok(())
}

#[tokio::test]
async fn test_gitlab_with_secret() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_shared_secret()
        .spawn()
        .await?;

    assert_eq!(route_statuses(&server).await?, vec![401, 401, 404, 404]);

    Ok(())
}

#[tokio::test]
async fn test_github_with_secret() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_github()
        .with_shared_secret()
        .spawn()
        .await?;

    assert_eq!(route_statuses(&server).await?, vec![404, 404, 401, 401]);

    Ok(())
}

#[tokio::test]
async fn test_all_routes() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_github()
        .with_shared_secret()
        .spawn()
        .await?;

    assert_eq!(route_statuses(&server).await?, vec![401, 401, 401, 401]);

    Ok(())
}

#[tokio::test]
async fn test_incomplete_gitlab_group_is_disabled() -> Result<()> {
    // Empty values count as unset
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_github()
        .with_shared_secret()
        .with_var("GITLAB_TOKEN", "")
        .spawn()
        .await?;

    assert_eq!(route_statuses(&server).await?, vec![404, 404, 401, 401]);

    Ok(())
}

#[tokio::test]
async fn test_incomplete_github_group_is_disabled() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_github()
        .with_var("GITHUB_WORKFLOW", "")
        .spawn()
        .await?;

    assert_eq!(route_statuses(&server).await?, vec![401, 404, 404, 404]);

    Ok(())
}

#[tokio::test]
async fn test_sync_routes_only_accept_post() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_shared_secret()
        .spawn()
        .await?;

    let response = reqwest::get(format!("{}/api/gitlab/sync/jwt?image=app:1", server.url())).await?;
    assert_eq!(response.status(), 405);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_jwks_aborts_startup() -> Result<()> {
    let result = TestGatewayServer::builder()
        .with_gitlab()
        .with_var("GITLAB_JWKS_URL", "http://127.0.0.1:9/oauth/discovery/keys")
        .spawn()
        .await;

    assert!(result.is_err(), "startup must fail without provider keys");

    Ok(())
}
