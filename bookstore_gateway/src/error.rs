use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use bookstore_resources::resource_store::StoreError;
use bookstore_users::auth_service::AuthError;
use bookstore_users::token::TokenError;

use crate::api::ErrorResponse;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Conflict,
    UpstreamUnavailable,
    InternalError,
}

/// Failure of a gateway operation as reported to the caller
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Unauthorized(_) => ErrorKind::Unauthorized,
            GatewayError::Forbidden(_) => ErrorKind::Forbidden,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::BadRequest(_) => ErrorKind::BadRequest,
            GatewayError::Conflict(_) => ErrorKind::Conflict,
            GatewayError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            GatewayError::InternalError(_) => ErrorKind::InternalError,
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => GatewayError::NotFound(err.to_string()),
            StoreError::Conflict(message) => GatewayError::Conflict(message),
            StoreError::Invalid(message) => GatewayError::BadRequest(message),
            StoreError::Unavailable(_) => {
                GatewayError::UpstreamUnavailable("Dependent service is unavailable".to_string())
            }
            StoreError::Upstream { message, .. } => GatewayError::InternalError(message),
            StoreError::DeserializationError(_)
            | StoreError::DatabaseFailure(_)
            | StoreError::Other(_) => GatewayError::InternalError("Internal error".to_string()),
        }
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => GatewayError::Unauthorized("Token has expired".to_string()),
            TokenError::Invalid(_) => GatewayError::Unauthorized("Invalid token".to_string()),
            TokenError::Signing(_) => GatewayError::InternalError("Internal error".to_string()),
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken(_) => GatewayError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => GatewayError::Unauthorized(err.to_string()),
            AuthError::UserNotFound(_) => GatewayError::NotFound(err.to_string()),
            AuthError::Invalid(message) => GatewayError::BadRequest(message),
            AuthError::SignupNotAllowed(message) => GatewayError::Forbidden(message),
            AuthError::Hashing(_) => GatewayError::InternalError("Internal error".to_string()),
            AuthError::Token(err) => err.into(),
            AuthError::Store(err) => err.into(),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::UpstreamUnavailable => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}

/// Logs a failed store call with its operation context and maps it to the gateway taxonomy
pub fn store_failure(operation: &str, err: StoreError) -> GatewayError {
    match &err {
        StoreError::NotFound { .. } | StoreError::Invalid(_) | StoreError::Conflict(_) => {
            tracing::info!("{} rejected: {}", operation, err)
        }
        _ => tracing::error!("{} failed: {}", operation, err),
    }
    err.into()
}

/// Same as [`store_failure`] for calls to the users service
pub fn auth_failure(operation: &str, err: AuthError) -> GatewayError {
    match &err {
        AuthError::Hashing(_) | AuthError::Token(_) | AuthError::Store(_) => {
            tracing::error!("{} failed: {}", operation, err)
        }
        _ => tracing::info!("{} rejected: {}", operation, err),
    }
    err.into()
}
