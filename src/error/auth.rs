//! Errors raised by the authentication core: header parsing, credential checks,
//! the authorization-code exchange and token-cache consumption.

use axum::http::StatusCode;
use thiserror::Error;

/// The primary error type for every authentication operation.
///
/// `Clone` so that the outcome of one in-flight exchange can be handed to every
/// callback request waiting on the same authorization code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    MalformedHeader,

    #[error("Invalid authentication scheme")]
    UnsupportedScheme,

    /// Username/password login failed. Never says which field was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Token has expired")]
    ExpiredCredential,

    #[error("Invalid or expired token")]
    InvalidOrExpiredCredential,

    /// Token endpoint answered with a non-success status. `body` is verbatim.
    #[error("Token exchange failed with status {status}")]
    UpstreamExchange { status: u16, body: String },

    /// Userinfo endpoint answered with a non-success status. `body` is verbatim.
    #[error("Failed to get user info: status {status}")]
    UpstreamProfile { status: u16, body: String },

    #[error("Malformed identity provider response: {0}")]
    MalformedUpstreamResponse(String),

    /// Connection refused, DNS failure, timeout.
    #[error("Identity provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Token not found")]
    TokenNotFound,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status and stable error code for this error.
    ///
    /// Upstream failures reuse the identity provider's status so callers see the
    /// provider's own diagnosis.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingHeader => (StatusCode::UNAUTHORIZED, "MISSING_AUTH_HEADER"),
            Self::MalformedHeader => (StatusCode::UNAUTHORIZED, "MALFORMED_AUTH_HEADER"),
            Self::UnsupportedScheme => (StatusCode::UNAUTHORIZED, "UNSUPPORTED_AUTH_SCHEME"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::InvalidCredential => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::ExpiredCredential => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::InvalidOrExpiredCredential => {
                (StatusCode::UNAUTHORIZED, "INVALID_OR_EXPIRED_TOKEN")
            }
            Self::UpstreamExchange { status, .. } => {
                (upstream_status(*status), "UPSTREAM_EXCHANGE_ERROR")
            }
            Self::UpstreamProfile { status, .. } => {
                (upstream_status(*status), "UPSTREAM_PROFILE_ERROR")
            }
            Self::MalformedUpstreamResponse(_) => {
                (StatusCode::BAD_GATEWAY, "MALFORMED_UPSTREAM_RESPONSE")
            }
            Self::UpstreamUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
            }
            Self::TokenNotFound => (StatusCode::NOT_FOUND, "TOKEN_NOT_FOUND"),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            Self::UnsupportedOperation(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, "UNSUPPORTED_OPERATION")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_AUTH_ERROR"),
        }
    }

    /// Upstream status code, when the error came from an HTTP answer.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamExchange { status, .. } | Self::UpstreamProfile { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Raw upstream body, when the error came from an HTTP answer.
    #[must_use]
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            Self::UpstreamExchange { body, .. } | Self::UpstreamProfile { body, .. } => {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedUpstreamResponse(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_keep_provider_status() {
        let err = AuthError::UpstreamExchange {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "UPSTREAM_EXCHANGE_ERROR");
        assert_eq!(err.upstream_status(), Some(400));
        assert_eq!(err.upstream_body(), Some(r#"{"error":"invalid_grant"}"#));
    }

    #[test]
    fn test_unavailable_is_not_a_credential_error() {
        let (status, _) = AuthError::UpstreamUnavailable("timeout".into()).status_and_code();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = AuthError::InvalidOrExpiredCredential.status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bogus_upstream_status_falls_back_to_bad_gateway() {
        let err = AuthError::UpstreamProfile {
            status: 42,
            body: String::new(),
        };
        assert_eq!(err.status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_not_found_and_login_failures() {
        assert_eq!(
            AuthError::TokenNotFound.status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }
}
