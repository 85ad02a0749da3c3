use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Failure taxonomy for the registration pipeline.
///
/// Validation failures are field-scoped and never leave partial state behind;
/// database and export failures surface as generic 500s (logged, no retry).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Terms and conditions must be agreed to register")]
    TermsNotAccepted,

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TermsNotAccepted | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Export(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ApiError> for (StatusCode, Json<Value>) {
    fn from(err: ApiError) -> Self {
        if err.status().is_server_error() {
            tracing::error!("request failed: {err}");
        }
        (err.status(), Json(json!({ "error": err.to_string() })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(ApiError::TermsNotAccepted.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::validation("photo", "too large").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_message_names_the_field() {
        let err = ApiError::validation("date_of_birth", "must be DD-MM-YYYY");
        assert_eq!(err.to_string(), "date_of_birth: must be DD-MM-YYYY");
    }

    #[test]
    fn test_export_errors_are_server_errors() {
        let err = ApiError::Export("disk full".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
