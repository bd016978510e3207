use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::reconciliation::{self, VerificationResult};
use crate::state::AppState;

// GET /api/payments/verify?session_id=
#[derive(Deserialize)]
pub struct VerifyQuery {
    pub session_id: String,
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerificationResult>, AppError> {
    let session_id = query.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::Validation("session_id is required".to_string()));
    }
    Ok(Json(reconciliation::verify_session(&state, session_id).await?))
}
