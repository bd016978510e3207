use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AvailabilityRule, BlockedDate, Booking, BookingStatus, Payment, Style};
use crate::services::booking;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if expected_token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {raw}")))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status_filter = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(BookingStatus::parse(raw).ok_or_else(|| AppError::InvalidStatus(raw.to_string()))?),
        None => None,
    };
    let date_filter = query.date.as_deref().map(parse_date).transpose()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let conn = state.conn()?;
    Ok(Json(queries::list_bookings(&conn, status_filter, date_filter, limit)?))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    Ok(Json(booking::transition_status(&conn, &id, &body.status)?))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    Ok(Json(booking::transition_status(&conn, &id, BookingStatus::Cancelled.as_str())?))
}

// GET /api/admin/bookings/:id/payments
pub async fn booking_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Payment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    let found = booking::get_by_id(&conn, &id)?;
    Ok(Json(queries::list_payments_for_booking(&conn, &found.id)?))
}

// POST /api/admin/payments/:id/refund
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Payment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    Ok(Json(booking::refund_payment(&conn, &id)?))
}

// GET /api/admin/blocked-dates
pub async fn list_blocked_dates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BlockedDate>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    Ok(Json(queries::list_blocked_dates(&conn)?))
}

// POST /api/admin/blocked-dates
#[derive(Deserialize)]
pub struct BlockDateBody {
    pub date: String,
    pub stylist_id: Option<String>,
    pub reason: Option<String>,
}

pub async fn block_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BlockDateBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&body.date)?;
    let stylist_id = body.stylist_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let conn = state.conn()?;
    let id = queries::block_date(&conn, date, stylist_id, body.reason.as_deref())?;
    tracing::info!(%date, stylist_id = ?stylist_id, "date blocked");

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "ok": true, "id": id }))))
}

// DELETE /api/admin/blocked-dates/:id
pub async fn unblock_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    if !queries::unblock_date(&conn, id)? {
        return Err(AppError::NotFound(format!("blocked date {id}")));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// GET /api/admin/availability
pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.conn()?;
    Ok(Json(queries::list_rules(&conn)?))
}

// POST /api/admin/availability
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(rules): Json<Vec<AvailabilityRule>>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    for rule in &rules {
        rule.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    }

    let mut conn = state.conn()?;
    let tx = conn.transaction()?;
    for rule in &rules {
        queries::upsert_rule(&tx, rule)?;
    }
    tx.commit()?;
    tracing::info!(count = rules.len(), "availability rules updated");

    Ok(Json(queries::list_rules(&conn)?))
}

// POST /api/admin/styles
#[derive(Deserialize)]
pub struct CreateStyleBody {
    pub id: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
}

pub async fn create_style(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateStyleBody>,
) -> Result<(StatusCode, Json<Style>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if body.price <= Decimal::ZERO {
        return Err(AppError::Validation("price must be positive".to_string()));
    }
    if body.duration_minutes <= 0 {
        return Err(AppError::Validation("duration_minutes must be positive".to_string()));
    }

    let style = Style {
        id: body
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: name.to_string(),
        price: body.price.round_dp(2),
        duration_minutes: body.duration_minutes,
        is_active: true,
    };

    let conn = state.conn()?;
    if let Err(e) = queries::create_style(&conn, &style) {
        return Err(match queries::unique_violation(&e) {
            Some(_) => AppError::Validation(format!("style {} already exists", style.id)),
            None => e.into(),
        });
    }
    tracing::info!(style_id = %style.id, "style created");

    Ok((StatusCode::CREATED, Json(style)))
}
