use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("temporarily unavailable: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("This time is no longer available. Please pick another slot.")]
    SlotConflict,

    #[error("We are closed on that date. Please choose another day.")]
    DateBlocked,

    #[error("That time is outside our opening hours ({hours}).")]
    OutsideBusinessHours { hours: String },

    #[error("could not allocate a booking reference, please try again shortly")]
    ReferenceExhausted,

    #[error("payment processor error: {0}")]
    Processor(String),

    #[error("We couldn't confirm your payment yet. Check your confirmation email or look up your booking with its reference.")]
    VerificationUnavailable,

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "unavailable",
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::SlotConflict => "slot_conflict",
            AppError::DateBlocked => "date_blocked",
            AppError::OutsideBusinessHours { .. } => "outside_business_hours",
            AppError::ReferenceExhausted => "reference_exhausted",
            AppError::Processor(_) => "processor",
            AppError::VerificationUnavailable => "verification_unavailable",
            AppError::InvalidSignature(_) => "invalid_signature",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Internal(_)
                | AppError::ReferenceExhausted
                | AppError::Processor(_)
                | AppError::VerificationUnavailable
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ReferenceExhausted => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. }
            | AppError::SlotConflict
            | AppError::DateBlocked
            | AppError::OutsideBusinessHours { .. } => StatusCode::CONFLICT,
            AppError::Processor(_) | AppError::VerificationUnavailable => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        (status, axum::Json(body)).into_response()
    }
}
