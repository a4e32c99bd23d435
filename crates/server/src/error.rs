//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers return
//! `Result<T, AppError>` unless the protocol demands a bare status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::StoreError;
use crate::pass::BuildError;
use crate::services::{NotifyError, RegistryError};

/// Application-level error type for the wallet service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Customer/registration store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Pass build or signing failed.
    #[error("Pass build error: {0}")]
    Build(#[from] BuildError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::CustomerNotFound(id) => Self::NotFound(format!("customer {id}")),
            NotifyError::Store(e) => Self::Store(e),
            NotifyError::Build(e) => Self::Build(e),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Store(e) => Self::Store(e),
            RegistryError::Build(e) => Self::Build(e),
        }
    }
}

impl AppError {
    /// Capture server-class errors to Sentry.
    fn capture(&self) {
        if matches!(self, Self::Store(_) | Self::Build(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }

    /// HTTP status this error maps to.
    const fn status(&self) -> StatusCode {
        match self {
            Self::Store(_) | Self::Build(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.capture();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Build(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (self.status(), message).into_response()
    }
}

/// Error wrapper for the wallet-protocol handlers.
///
/// Same Sentry capture and status mapping as [`AppError`], but the response
/// carries no body: the wallet client only interprets status codes, and the
/// protocol endpoints answer with bare codes on error.
#[derive(Debug)]
pub struct ProtocolError(AppError);

impl From<AppError> for ProtocolError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ProtocolError {
    fn from(err: StoreError) -> Self {
        Self(AppError::Store(err))
    }
}

impl From<RegistryError> for ProtocolError {
    fn from(err: RegistryError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        self.0.capture();
        self.0.status().into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
