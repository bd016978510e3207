pub mod admin;
pub mod bookings;
pub mod calendar;
pub mod health;
pub mod payments;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/styles", get(bookings::list_styles))
        .route("/api/availability", get(bookings::availability))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/:reference", get(bookings::get_booking))
        .route(
            "/api/bookings/:reference/checkout",
            post(bookings::start_checkout),
        )
        .route(
            "/api/bookings/:reference/calendar.ics",
            get(calendar::download_ics),
        )
        .route("/api/payments/verify", get(payments::verify))
        .route("/webhook/stripe", post(webhook::stripe_webhook))
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            post(admin::update_booking_status),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(admin::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/payments",
            get(admin::booking_payments),
        )
        .route(
            "/api/admin/payments/:id/refund",
            post(admin::refund_payment),
        )
        .route(
            "/api/admin/blocked-dates",
            get(admin::list_blocked_dates).post(admin::block_date),
        )
        .route(
            "/api/admin/blocked-dates/:id",
            delete(admin::unblock_date),
        )
        .route(
            "/api/admin/availability",
            get(admin::list_availability).post(admin::set_availability),
        )
        .route("/api/admin/styles", post(admin::create_style))
        .with_state(state)
}
