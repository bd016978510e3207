use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::booking;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /api/bookings/:reference/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Response, AppError> {
    let (found, style_name) = {
        let conn = state.conn()?;
        let found = booking::get_by_reference(&conn, &reference)?;
        let style_name = queries::get_style(&conn, &found.style_id)?
            .map(|s| s.name)
            .unwrap_or_else(|| "Appointment".to_string());
        (found, style_name)
    };

    let ics = generate_ics(&found, &style_name, &state.config.business_name);
    let filename = format!("booking-{}.ics", found.reference);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
