// Maps core errors onto HTTP replies of the form `{success: false, error}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::content::{SchemaError, StoreError};
use crate::core::library::LibraryError;
use crate::core::publishing::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// A platform or Google API refused or failed the call.
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
        }
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            StoreError::Schema(_) | StoreError::NotContent(_) => ApiError::BadRequest(e.to_string()),
            StoreError::Api(_) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::Validation(_) => ApiError::BadRequest(e.to_string()),
            PublishError::Store(store) => store.into(),
            PublishError::Transient(_) | PublishError::Rejected(_) => {
                ApiError::Upstream(e.to_string())
            }
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::Invalid(_) => ApiError::BadRequest(e.to_string()),
            LibraryError::Drive(_) => ApiError::Upstream(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let missing: ApiError = StoreError::NotFound {
            table: "Published_History".into(),
            index: 4,
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Row 4 not found in Published_History");

        let invalid: ApiError = PublishError::Validation("no media".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let flaky: ApiError = PublishError::Transient("timeout".into()).into();
        assert_eq!(flaky.status(), StatusCode::BAD_GATEWAY);
    }
}
