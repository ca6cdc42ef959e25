//! Gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Credential
//! failures carry short, fixed markers (`Invalid token: DecodeError`, ...) so
//! CI callers can tell why they were rejected. Transport details of failed
//! downstream calls are logged server-side only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a bearer JWT was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    /// Token is oversized, not a JWT, or carries undecodable claims.
    #[error("DecodeError")]
    Decode,

    /// No key in the provider's key set verifies the signature.
    #[error("BadSignatureError")]
    BadSignature,

    /// Token `exp` is in the past (beyond clock skew).
    #[error("ExpiredTokenError")]
    Expired,

    /// Token audience does not contain the configured audience.
    #[error("InvalidAudienceError")]
    InvalidAudience,
}

impl TokenRejection {
    /// Bounded label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TokenRejection::Decode => "decode",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::Expired => "expired",
            TokenRejection::InvalidAudience => "invalid_audience",
        }
    }
}

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - MissingCredential, InvalidSecret: 401 Unauthorized
/// - InvalidToken, InvalidIssuer: 403 Forbidden
/// - BadRequest: 400 Bad Request
/// - Upstream: the downstream status, echoed
/// - UpstreamUnavailable: 502 Bad Gateway
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid token: {0}")]
    InvalidToken(TokenRejection),

    #[error("Invalid issuer {0}")]
    InvalidIssuer(String),

    #[error("Invalid authorization token")]
    InvalidSecret,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MissingCredential(_) | GatewayError::InvalidSecret => 401,
            GatewayError::InvalidToken(_) | GatewayError::InvalidIssuer(_) => 403,
            GatewayError::BadRequest(_) => 400,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::UpstreamUnavailable(_) => 502,
            GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

        let (code, message) = match &self {
            GatewayError::MissingCredential(reason) => ("MISSING_CREDENTIAL", reason.clone()),
            GatewayError::InvalidToken(rejection) => {
                ("INVALID_TOKEN", format!("Invalid token: {}", rejection))
            }
            GatewayError::InvalidIssuer(issuer) => {
                ("INVALID_ISSUER", format!("Invalid issuer {}", issuer))
            }
            GatewayError::InvalidSecret => (
                "INVALID_CREDENTIAL",
                "Invalid authorization token".to_string(),
            ),
            GatewayError::BadRequest(reason) => ("BAD_REQUEST", reason.clone()),
            GatewayError::Upstream { body, .. } => {
                ("UPSTREAM_ERROR", format!("Token server error: {}", body))
            }
            GatewayError::UpstreamUnavailable(reason) => {
                tracing::warn!(target: "ug.availability", reason = %reason, "Pipeline trigger unreachable");
                (
                    "UPSTREAM_UNAVAILABLE",
                    "Pipeline trigger service is unavailable".to_string(),
                )
            }
            GatewayError::Internal => ("INTERNAL_ERROR", "An internal error occurred".to_string()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"unpack-gateway\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
