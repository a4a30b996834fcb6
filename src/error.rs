use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
    pub(crate) status: u16,
}

impl ErrorBody {
    pub(crate) fn respond(status: StatusCode, message: String) -> Response {
        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Errors from encoding, decoding and verifying tokens.
///
/// Cloneable so a verification outcome can be stored in request extensions
/// and read by any number of downstream layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("jwtauth: unauthorized token")]
    Unauthorized,

    #[error("jwtauth: expired token")]
    TokenExpired,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token signing method does not match the configured algorithm")]
    AlgorithmMismatch,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid claim: {0}")]
    InvalidClaim(String),

    #[error("Unusable key: {0}")]
    InvalidKey(String),

    #[error("Auth not configured: {0}")]
    ConfigError(String),
}

impl AuthError {
    /// True for the two outcomes the verifier distinguishes by kind.
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::TokenExpired)
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::MalformedToken(e.to_string()),
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey => {
                AuthError::InvalidKey(e.to_string())
            }
            _ => AuthError::InvalidToken(e.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::ConfigError(_) | AuthError::InvalidKey(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };

        ErrorBody::respond(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_kind_maps_structurally() {
        let e: AuthError = JwtError::from(ErrorKind::ExpiredSignature).into();
        assert_eq!(e, AuthError::TokenExpired);
        assert!(e.is_expired());
    }

    #[test]
    fn algorithm_kind_maps_to_mismatch() {
        let e: AuthError = JwtError::from(ErrorKind::InvalidAlgorithm).into();
        assert_eq!(e, AuthError::AlgorithmMismatch);
    }

    #[test]
    fn config_errors_render_500() {
        let resp = AuthError::ConfigError("no secret".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = AuthError::TokenExpired.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
