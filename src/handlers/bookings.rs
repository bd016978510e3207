use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PaymentType, Style};
use crate::services::booking::{self, BookingView, CheckoutOutcome, CreateBookingRequest};
use crate::services::scheduling::{self, SlotListing};
use crate::state::AppState;

const DEFAULT_SLOT_MINUTES: i32 = 60;

// GET /api/styles
pub async fn list_styles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Style>>, AppError> {
    let conn = state.conn()?;
    Ok(Json(queries::list_active_styles(&conn)?))
}

// GET /api/availability?date=YYYY-MM-DD&style_id=
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub style_id: Option<String>,
}

pub async fn availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<SlotListing>, AppError> {
    let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;

    let conn = state.conn()?;
    let duration = match query.style_id.as_deref().filter(|s| !s.is_empty()) {
        Some(style_id) => {
            queries::get_style(&conn, style_id)?
                .filter(|s| s.is_active)
                .ok_or_else(|| AppError::NotFound(format!("style {style_id}")))?
                .duration_minutes
        }
        None => DEFAULT_SLOT_MINUTES,
    };

    Ok(Json(scheduling::slot_listing(&conn, date, duration)?))
}

// POST /api/bookings
#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub booking: BookingView,
    pub checkout: CheckoutOutcome,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let (new, payment_type) = body.validate()?;

    let booking = {
        let mut conn = state.conn()?;
        booking::create_booking(&mut conn, &state.config.reference_prefix, &new)?
    };

    let checkout = booking::start_checkout(&state, &booking.id, payment_type)
        .await
        .map_err(|e| match e {
            AppError::Processor(msg) => AppError::Processor(format!(
                "{msg}. Booking {} is saved; retry payment from your booking page.",
                booking.reference
            )),
            other => other,
        })?;

    let view = {
        let conn = state.conn()?;
        let current = booking::get_by_id(&conn, &booking.id)?;
        booking::booking_view(&conn, current)?
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking: view,
            checkout,
        }),
    ))
}

// GET /api/bookings/:reference
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let conn = state.conn()?;
    let found = booking::get_by_reference(&conn, &reference)?;
    Ok(Json(booking::booking_view(&conn, found)?))
}

// POST /api/bookings/:reference/checkout
#[derive(Deserialize)]
pub struct CheckoutBody {
    pub payment_type: String,
}

pub async fn start_checkout(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutOutcome>, AppError> {
    let payment_type = PaymentType::parse(&body.payment_type)
        .ok_or_else(|| AppError::Validation(format!("unknown payment_type: {}", body.payment_type)))?;

    let booking_id = {
        let conn = state.conn()?;
        booking::get_by_reference(&conn, &reference)?.id
    };

    Ok(Json(booking::start_checkout(&state, &booking_id, payment_type).await?))
}
