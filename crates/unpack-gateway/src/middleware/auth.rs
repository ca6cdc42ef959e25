//! Authentication middleware for sync routes.
//!
//! Each registered sync route carries one of two route layers:
//! - `require_jwt`: `Authorization: Bearer <token>` validated against the
//!   provider's key set
//! - `require_shared_secret`: the raw `Authorization` value compared with
//!   `SECRET_TOKEN`
//!
//! On success an [`AuthenticatedCaller`] is stored in request extensions.

use crate::auth::jwt::JwtValidator;
use crate::auth::secret::SharedSecret;
use crate::errors::{GatewayError, TokenRejection};
use crate::models::{AuthScheme, AuthenticatedCaller, Provider};
use crate::observability::metrics::record_auth_result;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the JWT authentication middleware.
#[derive(Clone)]
pub struct JwtAuthState {
    pub provider: Provider,

    /// Validator holding the provider's key set.
    pub jwt_validator: Arc<JwtValidator>,
}

/// State for the shared-secret authentication middleware.
#[derive(Clone)]
pub struct SecretAuthState {
    pub provider: Provider,
    pub shared_secret: SharedSecret,
}

/// Middleware that validates a provider-issued JWT.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 if the header is missing, empty, or not a Bearer credential
/// - 403 if the token is invalid or from another issuer
/// - Continues to the handler with the caller in extensions otherwise
#[instrument(skip(state, req, next), name = "ug.middleware.auth.jwt", fields(provider = %state.provider))]
pub async fn require_jwt(
    State(state): State<Arc<JwtAuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let result = authenticate_jwt(&state, &req);
    record_auth_result(
        state.provider.as_str(),
        AuthScheme::Jwt.as_str(),
        auth_outcome(result.as_ref().err()),
    );

    req.extensions_mut().insert(result?);
    Ok(next.run(req).await)
}

fn authenticate_jwt(
    state: &JwtAuthState,
    req: &Request,
) -> Result<AuthenticatedCaller, GatewayError> {
    let auth_header = authorization_header(req)?;

    let auth_header = std::str::from_utf8(auth_header).map_err(|_| {
        tracing::debug!(target: "ug.middleware.auth", "Authorization header is not valid UTF-8");
        GatewayError::InvalidToken(TokenRejection::Decode)
    })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "ug.middleware.auth", "Invalid Authorization header format");
        GatewayError::MissingCredential(
            "Authorization header must use the Bearer scheme".to_string(),
        )
    })?;

    let claims = state.jwt_validator.validate(token)?;

    Ok(AuthenticatedCaller {
        scheme: AuthScheme::Jwt,
        origin: claims.origin().map(str::to_string),
    })
}

/// Middleware that checks the static shared secret.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: <shared-secret>
/// ```
///
/// # Response
///
/// - 401 if the header is missing or does not equal the configured secret
/// - Continues to the handler with the caller in extensions otherwise
#[instrument(skip(state, req, next), name = "ug.middleware.auth.secret", fields(provider = %state.provider))]
pub async fn require_shared_secret(
    State(state): State<Arc<SecretAuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let result = authenticate_secret(&state, &req);
    record_auth_result(
        state.provider.as_str(),
        AuthScheme::Secret.as_str(),
        auth_outcome(result.as_ref().err()),
    );

    req.extensions_mut().insert(result?);
    Ok(next.run(req).await)
}

fn authenticate_secret(
    state: &SecretAuthState,
    req: &Request,
) -> Result<AuthenticatedCaller, GatewayError> {
    let presented = authorization_header(req)?;

    let matches = std::str::from_utf8(presented)
        .map(|value| state.shared_secret.verify(value))
        .unwrap_or(false);

    if !matches {
        tracing::debug!(target: "ug.middleware.auth", "Shared secret mismatch");
        return Err(GatewayError::InvalidSecret);
    }

    Ok(AuthenticatedCaller {
        scheme: AuthScheme::Secret,
        origin: None,
    })
}

/// Raw `Authorization` header bytes; absent or empty is a missing credential.
fn authorization_header(req: &Request) -> Result<&[u8], GatewayError> {
    match req.headers().get(AUTHORIZATION).map(|h| h.as_bytes()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => {
            tracing::debug!(target: "ug.middleware.auth", "Missing Authorization header");
            Err(GatewayError::MissingCredential(
                "No Authorization header provided".to_string(),
            ))
        }
    }
}

/// Bounded metrics label for an authentication outcome.
fn auth_outcome(error: Option<&GatewayError>) -> &'static str {
    match error {
        None => "success",
        Some(GatewayError::MissingCredential(_)) => "missing_credential",
        Some(GatewayError::InvalidToken(rejection)) => rejection.as_label(),
        Some(GatewayError::InvalidIssuer(_)) => "invalid_issuer",
        Some(GatewayError::InvalidSecret) => "invalid_secret",
        Some(_) => "error",
    }
}
