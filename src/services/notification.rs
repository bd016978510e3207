use std::collections::HashSet;
use std::sync::Mutex;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::booking;
use crate::services::email::EmailMessage;
use crate::state::AppState;

/// Holds a booking id in the in-flight set until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    booking_id: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, booking_id: &str) -> Option<Self> {
        let mut guard = set.lock().ok()?;
        if !guard.insert(booking_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            booking_id: booking_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.set.lock() {
            guard.remove(&self.booking_id);
        }
    }
}

/// Sends the booking confirmation unless it already went out. Dispatch
/// failures are logged and leave the flag unset for a later attempt.
pub async fn send_confirmation_if_needed(state: &AppState, booking_id: &str) {
    if let Err(e) = try_send_confirmation(state, booking_id).await {
        tracing::warn!(booking_id, error = %e, "confirmation email not sent");
    }
}

async fn try_send_confirmation(state: &AppState, booking_id: &str) -> Result<(), AppError> {
    let Some(_claim) = InFlight::claim(&state.notifications_in_flight, booking_id) else {
        tracing::debug!(booking_id, "confirmation already being sent");
        return Ok(());
    };

    let message = {
        let conn = state.conn()?;
        let booking = booking::get_by_id(&conn, booking_id)?;
        if booking.confirmation_sent {
            return Ok(());
        }
        if !matches!(booking.status, BookingStatus::Confirmed | BookingStatus::Completed) {
            tracing::info!(reference = %booking.reference, status = %booking.status, "booking not confirmed, skipping email");
            return Ok(());
        }
        let view = booking::booking_view(&conn, booking)?;
        compose_confirmation(
            &view.booking,
            &view.style_name,
            view.amount_paid,
            view.balance_due,
            &state.config.business_name,
            &state.config.currency,
            state.config.business_email.as_deref(),
        )
    };

    state
        .email
        .send(&message)
        .await
        .map_err(AppError::Internal)?;

    let conn = state.conn()?;
    if queries::mark_confirmation_sent(&conn, booking_id)? {
        tracing::info!(booking_id, "confirmation email sent");
    }
    Ok(())
}

pub fn compose_confirmation(
    booking: &Booking,
    style_name: &str,
    amount_paid: rust_decimal::Decimal,
    balance_due: rust_decimal::Decimal,
    business_name: &str,
    currency: &str,
    business_email: Option<&str>,
) -> EmailMessage {
    let bcc = business_email.map(String::from).into_iter().collect();
    let currency = currency.to_uppercase();

    let text = format!(
        "Hi {name},\n\n\
         Your appointment at {business_name} is confirmed.\n\n\
         Reference: {reference}\n\
         Service: {style_name}\n\
         Date: {date}\n\
         Time: {start} - {end}\n\
         Paid: {amount_paid} {currency}\n\
         Balance due: {balance_due} {currency}\n\n\
         Keep your reference to look up or manage your booking.\n",
        name = booking.customer_name,
        reference = booking.reference,
        date = booking.date.format("%A %-d %B %Y"),
        start = queries::format_time(booking.start_time),
        end = queries::format_time(booking.end_time),
    );

    EmailMessage {
        to: vec![booking.customer_email.clone()],
        bcc,
        subject: format!("Booking confirmed: {}", booking.reference),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use rust_decimal::Decimal;

    fn booking() -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: "b1".to_string(),
            reference: "LAYO-AB12C3".to_string(),
            style_id: "knotless".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "0700".to_string(),
            notes: None,
            total_price: Decimal::new(12000, 2),
            status: BookingStatus::Confirmed,
            confirmation_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_confirmation_contents() {
        let msg = compose_confirmation(
            &booking(),
            "Knotless Braids",
            Decimal::new(3600, 2),
            Decimal::new(8400, 2),
            "Layo Hair Studio",
            "gbp",
            Some("owner@example.com"),
        );
        assert_eq!(msg.to, vec!["ada@example.com"]);
        assert_eq!(msg.bcc, vec!["owner@example.com"]);
        assert!(msg.subject.contains("LAYO-AB12C3"));
        assert!(msg.text.contains("Knotless Braids"));
        assert!(msg.text.contains("Sunday 1 June 2025"));
        assert!(msg.text.contains("10:00 - 13:00"));
        assert!(msg.text.contains("Paid: 36.00 GBP"));
        assert!(msg.text.contains("Balance due: 84.00 GBP"));
    }

    #[test]
    fn test_no_copy_without_business_email() {
        let msg = compose_confirmation(
            &booking(),
            "Knotless Braids",
            Decimal::ZERO,
            Decimal::new(12000, 2),
            "Layo Hair Studio",
            "gbp",
            None,
        );
        assert_eq!(msg.to, vec!["ada@example.com"]);
        assert!(msg.bcc.is_empty());
    }

    #[test]
    fn test_in_flight_claim_is_exclusive() {
        let set = Mutex::new(HashSet::new());
        let first = InFlight::claim(&set, "b1");
        assert!(first.is_some());
        assert!(InFlight::claim(&set, "b1").is_none());
        drop(first);
        assert!(InFlight::claim(&set, "b1").is_some());
    }
}
