//! Authentication integration tests.
//!
//! Exercises the JWT and shared-secret layers of the sync routes against a
//! gateway whose providers are wiremock servers publishing fixture keys.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use ug_test_utils::{
    TestGatewayServer, TestKeypair, TestSigningKey, TestTokenBuilder, GITLAB_ED25519_KID,
    GITLAB_RSA_KID, TEST_SHARED_SECRET,
};

const GITLAB_JWT: &str = "/api/gitlab/sync/jwt?image=registry.example.com/app:1.2.3";
const GITLAB_SECRET: &str = "/api/gitlab/sync/secret?image=registry.example.com/app:1.2.3";
const GITHUB_JWT: &str = "/api/github/sync/jwt?image=registry.example.com/app:1.2.3";
const GITHUB_SECRET: &str = "/api/github/sync/secret?image=registry.example.com/app:1.2.3";

async fn spawn_all() -> Result<TestGatewayServer> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_github()
        .with_shared_secret()
        .spawn()
        .await?;
    server.mount_gitlab_trigger(201, "{\"id\":1}").await;
    server.mount_github_dispatch(204, "").await;
    Ok(server)
}

async fn post(
    server: &TestGatewayServer,
    route: &str,
    authorization: Option<&str>,
) -> Result<reqwest::Response> {
    let mut request = reqwest::Client::new().post(format!("{}{}", server.url(), route));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    Ok(request.send().await?)
}

async fn error_message(response: reqwest::Response) -> Result<String> {
    let body: serde_json::Value = response.json().await?;
    Ok(body["error"]["message"].as_str().unwrap_or_default().to_string())
}

// =============================================================================
// Missing credentials
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_is_unauthorized_on_every_route() -> Result<()> {
    let server = spawn_all().await?;

    for route in [GITLAB_JWT, GITLAB_SECRET, GITHUB_JWT, GITHUB_SECRET] {
        let response = post(&server, route, None).await?;
        assert_eq!(response.status(), 401, "{route}");
        assert!(
            response.headers().get("www-authenticate").is_some(),
            "401 should include WWW-Authenticate ({route})"
        );
        assert_eq!(
            error_message(response).await?,
            "No Authorization header provided"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_empty_authorization_is_unauthorized() -> Result<()> {
    let server = spawn_all().await?;

    for route in [GITLAB_JWT, GITLAB_SECRET] {
        let response = post(&server, route, Some("")).await?;
        assert_eq!(response.status(), 401, "{route}");
    }

    Ok(())
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() -> Result<()> {
    let server = spawn_all().await?;

    let response = post(&server, GITLAB_JWT, Some("Basic dXNlcjpwYXNz")).await?;
    assert_eq!(response.status(), 401);

    Ok(())
}

// =============================================================================
// JWT validation
// =============================================================================

#[tokio::test]
async fn test_valid_gitlab_rsa_token_is_accepted() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer()).sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_valid_gitlab_ed25519_token_is_accepted() -> Result<()> {
    let server = spawn_all().await?;
    let token =
        TestTokenBuilder::gitlab(&server.gitlab_issuer()).sign(server.gitlab_ed25519_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_valid_github_token_is_accepted() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::github().sign(server.github_key());

    let response = post(&server, GITHUB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_syntactically_invalid_token_is_decode_error() -> Result<()> {
    let server = spawn_all().await?;

    for token in ["not-a-jwt", "a.b.c", "eyJhbGciOiJSUzI1NiJ9"] {
        let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
        assert_eq!(response.status(), 403, "{token}");
        assert_eq!(
            error_message(response).await?,
            "Invalid token: DecodeError"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_oversized_token_is_decode_error() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer())
        .with_claim("padding", serde_json::json!("x".repeat(9000)))
        .sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: DecodeError"
    );

    Ok(())
}

#[tokio::test]
async fn test_wrongly_signed_token_is_bad_signature() -> Result<()> {
    let server = spawn_all().await?;
    // Same kid as the published Ed25519 key, different key material
    let impostor = TestKeypair::new(99, GITLAB_ED25519_KID)?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer()).sign(&impostor);

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: BadSignatureError"
    );

    assert!(server.gitlab_trigger_requests().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_kid_is_bad_signature() -> Result<()> {
    let server = spawn_all().await?;
    let unknown = TestKeypair::new(1, "rotated-away")?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer()).sign(&unknown);

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: BadSignatureError"
    );

    Ok(())
}

#[tokio::test]
async fn test_token_for_other_provider_is_rejected() -> Result<()> {
    let server = spawn_all().await?;
    // Signed with the GitLab key, presented to the GitHub route
    let token = TestTokenBuilder::github().sign(server.gitlab_key());

    let response = post(&server, GITHUB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: BadSignatureError"
    );

    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_rejected() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer())
        .issued_in(-7200)
        .expires_in(-3600)
        .sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: ExpiredTokenError"
    );

    Ok(())
}

#[tokio::test]
async fn test_future_iat_is_rejected() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer())
        .issued_in(3600)
        .expires_in(7200)
        .sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: DecodeError"
    );

    Ok(())
}

#[tokio::test]
async fn test_mismatched_issuer_is_rejected() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab("https://gitlab.attacker.example").sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_ISSUER");
    assert_eq!(
        body["error"]["message"],
        "Invalid issuer https://gitlab.attacker.example"
    );

    assert!(server.gitlab_trigger_requests().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_issuer_trailing_slash_is_accepted() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&format!("{}/", server.gitlab_issuer()))
        .sign(server.gitlab_key());

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_configured_audience_is_enforced() -> Result<()> {
    let server = TestGatewayServer::builder()
        .with_gitlab()
        .with_var("GITLAB_JWT_AUDIENCE", "unpack-gateway")
        .spawn()
        .await?;
    server.mount_gitlab_trigger(201, "{}").await;

    let accepted = TestTokenBuilder::gitlab(&server.gitlab_issuer())
        .with_audience("unpack-gateway")
        .sign(server.gitlab_key());
    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {accepted}"))).await?;
    assert_eq!(response.status(), 200);

    let wrong_audience = TestTokenBuilder::gitlab(&server.gitlab_issuer())
        .with_audience("someone-else")
        .sign(server.gitlab_key());
    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {wrong_audience}"))).await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: InvalidAudienceError"
    );

    Ok(())
}

#[tokio::test]
async fn test_kid_is_optional() -> Result<()> {
    let server = spawn_all().await?;

    let claims = TestTokenBuilder::gitlab(&server.gitlab_issuer()).build();
    let encoding_key =
        jsonwebtoken::EncodingKey::from_rsa_pem(ug_test_utils::RSA_TEST_KEY_PEM.as_bytes())?;
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
        &claims,
        &encoding_key,
    )?;

    let response = post(&server, GITLAB_JWT, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(server.gitlab_key().kid(), GITLAB_RSA_KID);

    Ok(())
}

// =============================================================================
// Shared secret
// =============================================================================

#[tokio::test]
async fn test_exact_secret_is_accepted() -> Result<()> {
    let server = spawn_all().await?;

    for route in [GITLAB_SECRET, GITHUB_SECRET] {
        let response = post(&server, route, Some(TEST_SHARED_SECRET)).await?;
        assert_eq!(response.status(), 200, "{route}");
    }

    Ok(())
}

#[tokio::test]
async fn test_other_secret_values_are_unauthorized() -> Result<()> {
    let server = spawn_all().await?;

    let near_misses = [
        "wrong".to_string(),
        format!("Bearer {TEST_SHARED_SECRET}"),
        format!("{TEST_SHARED_SECRET}x"),
        TEST_SHARED_SECRET.to_uppercase(),
    ];
    for value in &near_misses {
        let response = post(&server, GITLAB_SECRET, Some(value)).await?;
        assert_eq!(response.status(), 401, "{value}");
        assert_eq!(
            error_message(response).await?,
            "Invalid authorization token"
        );
    }

    assert!(server.gitlab_trigger_requests().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_jwt_is_not_accepted_on_secret_route() -> Result<()> {
    let server = spawn_all().await?;
    let token = TestTokenBuilder::gitlab(&server.gitlab_issuer()).sign(server.gitlab_key());

    let response = post(&server, GITLAB_SECRET, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 401);

    Ok(())
}

#[tokio::test]
async fn test_secret_is_not_accepted_on_jwt_route() -> Result<()> {
    let server = spawn_all().await?;

    let response = post(
        &server,
        GITLAB_JWT,
        Some(&format!("Bearer {TEST_SHARED_SECRET}")),
    )
    .await?;
    assert_eq!(response.status(), 403);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: DecodeError"
    );

    Ok(())
}
