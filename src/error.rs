use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input. Carries one message per bad field so the
    /// client sees everything wrong at once, not just the first problem.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Driver is unverified, unavailable, or driving the wrong vehicle class.
    #[error("{0}")]
    DriverNotEligible(String),

    /// Lost the acceptance race: the trip was accepted by another driver,
    /// cancelled, or expired. Expected under concurrency, not exceptional.
    #[error("trip is no longer available")]
    TripAlreadyTaken,

    #[error("{0}")]
    InvalidStateTransition(String),

    #[error("storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error kind, stable across message wording changes.
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::DriverNotEligible(_) => "driver_not_eligible",
            AppError::TripAlreadyTaken => "trip_already_taken",
            AppError::InvalidStateTransition(_) => "invalid_state_transition",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_)
            | AppError::DriverNotEligible(_)
            | AppError::TripAlreadyTaken
            | AppError::InvalidStateTransition(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Infrastructure failures are logged in full but surfaced opaque.
        let message = match &self {
            AppError::Storage(err) => {
                tracing::error!(error = %err, "database error");
                "internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        });

        if let AppError::Validation(details) = &self {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_failures_are_not_500s() {
        assert_eq!(AppError::TripAlreadyTaken.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::DriverNotEligible("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation(vec!["x".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidStateTransition("x".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_message_lists_every_field() {
        let err = AppError::Validation(vec![
            "origin.lat must be between -90 and 90".into(),
            "vehicle_class is not a known vehicle class".into(),
        ]);
        let text = err.to_string();
        assert!(text.contains("origin.lat"));
        assert!(text.contains("vehicle_class"));
    }
}
