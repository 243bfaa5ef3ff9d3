// error.rs — HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hodor_deployer::{DeployError, StoreError};

/// Error returned by a handler, rendered as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or URL is malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The job does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The engine cannot take more work right now.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a failed `deploy` call.
    pub fn from_deploy(err: DeployError) -> Self {
        let message = format!("failed to deploy: {err}");
        match err {
            DeployError::QueueFull | DeployError::Stopped => ApiError::Unavailable(message),
            DeployError::AlreadyStarted | DeployError::Store(_) => ApiError::Internal(message),
        }
    }

    /// Map a failed store lookup, prefixed with what was being looked up.
    pub fn from_store(context: &str, err: StoreError) -> Self {
        let message = format!("{context}: {err}");
        if err.is_not_found() {
            ApiError::NotFound(message)
        } else {
            ApiError::Internal(message)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        }
        (status, format!("{self}\n")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure_maps_to_service_unavailable() {
        let err = ApiError::from_deploy(DeployError::QueueFull);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "failed to deploy: buffer is full, re-try later");
    }

    #[test]
    fn stopped_maps_to_service_unavailable() {
        let err = ApiError::from_deploy(DeployError::Stopped);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
