//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies use the same envelope as successes, with `"status": "failed"`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::response::Envelope;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::notify::NotifyError;
use crate::services::throttle::ThrottleError;
use crate::services::tokens::TokenError;
use crate::services::uploads::UploadError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Product listing failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Token issuance or validation failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Notification webhook failed.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing or wrong API key.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidCode => StatusCode::BAD_REQUEST,
                AuthError::Throttle(ThrottleError::LimitExceeded) | AuthError::TooManyGuesses => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                AuthError::Repository(err) => repository_status(err),
                AuthError::Throttle(_) | AuthError::Store(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(err) => match err {
                TokenError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::Upload(err) => match err {
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Notify(err) => match err {
                NotifyError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return match status {
                StatusCode::BAD_GATEWAY => "External service error".to_string(),
                StatusCode::SERVICE_UNAVAILABLE => "Service unavailable".to_string(),
                _ => "Internal server error".to_string(),
            };
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => "Email already exist".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidCode => "Invalid or expired verification code".to_string(),
                AuthError::Throttle(_) => "Maximum login attempts exceeded".to_string(),
                AuthError::TooManyGuesses => "Too many verification attempts".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::Token(TokenError::Expired) => "Unauthorized - token expired".to_string(),
            Self::Token(_) => "Unauthorized".to_string(),
            Self::Upload(err) => err.to_string(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ThrottleError> for AppError {
    fn from(err: ThrottleError) -> Self {
        Self::Auth(AuthError::Throttle(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // Don't expose internal error details to clients
        let message = self.public_message(status);

        (status, Envelope::failed(message)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_client_errors_show_their_message() {
        let err = AppError::BadRequest("Invalid product price".to_string());
        assert_eq!(
            err.public_message(StatusCode::BAD_REQUEST),
            "Invalid product price"
        );

        let err = AppError::Database(RepositoryError::DataCorruption(
            "bad price column".to_string(),
        ));
        assert_eq!(
            err.public_message(StatusCode::INTERNAL_SERVER_ERROR),
            "Internal server error"
        );
    }

    #[test]
    fn test_throttle_errors() {
        assert_eq!(
            get_status(ThrottleError::LimitExceeded.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(ThrottleError::Store(KvError::Unavailable("down".to_string())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_and_token_errors() {
        assert_eq!(
            get_status(AuthError::TooManyGuesses.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AuthError::InvalidCode.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(TokenError::Expired.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(UploadError::MissingExtension.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(NotifyError::NotConfigured("password reset").into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_catalog_store_failure_is_server_error() {
        let err = CatalogError::Store(KvError::Unavailable("down".to_string()));
        assert_eq!(get_status(err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_duplicate_email_is_bad_request() {
        let err = AppError::from(AuthError::UserAlreadyExists);
        let status = err.status();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(status), "Email already exist");
    }
}
