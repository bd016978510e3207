use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, UniqueViolation};
use crate::errors::AppError;
use crate::models::{
    Balance, Booking, BookingStatus, NewBooking, Payment, PaymentStatus, PaymentType,
};
use crate::services::notification;
use crate::services::payments::CheckoutRequest;
use crate::services::reference::ReferenceAllocator;
use crate::services::scheduling;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub style_id: String,
    pub date: String,
    pub start_time: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

impl CreateBookingRequest {
    pub fn validate(&self) -> Result<(NewBooking, PaymentType), AppError> {
        let required = |value: &str, field: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(AppError::Validation(format!("{field} is required")))
            } else {
                Ok(value.to_string())
            }
        };

        let customer_name = required(&self.customer_name, "customer_name")?;
        let customer_email = required(&self.customer_email, "customer_email")?;
        let customer_phone = required(&self.customer_phone, "customer_phone")?;
        let style_id = required(&self.style_id, "style_id")?;
        if !customer_email.contains('@') {
            return Err(AppError::Validation("customer_email is not valid".to_string()));
        }

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;
        let start_time = NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M")
            .map_err(|_| AppError::Validation("start_time must be HH:MM".to_string()))?;

        let payment_type = match self.payment_type.as_deref() {
            None => PaymentType::Deposit,
            Some(raw) => PaymentType::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown payment_type: {raw}")))?,
        };

        Ok((
            NewBooking {
                style_id,
                date,
                start_time,
                customer_name,
                customer_email,
                customer_phone,
                notes: self
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from),
            },
            payment_type,
        ))
    }
}

/// Booking with its money position, as shown on the tracking page.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub style_name: String,
    pub amount_paid: rust_decimal::Decimal,
    pub balance_due: rust_decimal::Decimal,
    pub payments: Vec<Payment>,
}

pub fn booking_view(conn: &Connection, booking: Booking) -> Result<BookingView, AppError> {
    let style_name = queries::get_style(conn, &booking.style_id)?
        .map(|s| s.name)
        .unwrap_or_else(|| booking.style_id.clone());
    let payments = queries::list_payments_for_booking(conn, &booking.id)?;
    let balance = Balance::from_payments(booking.total_price, &payments);
    Ok(BookingView {
        booking,
        style_name,
        amount_paid: balance.amount_paid,
        balance_due: balance.balance_due,
        payments,
    })
}

pub fn balance_for(conn: &Connection, booking: &Booking) -> Result<Balance, AppError> {
    let payments = queries::list_payments_for_booking(conn, &booking.id)?;
    Ok(Balance::from_payments(booking.total_price, &payments))
}

pub fn get_by_reference(conn: &Connection, reference: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_reference(conn, reference)?
        .ok_or_else(|| AppError::NotFound(format!("booking {reference}")))
}

pub fn get_by_id(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// ── Creation ──

pub fn create_booking(conn: &mut Connection, prefix: &str, new: &NewBooking) -> Result<Booking, AppError> {
    create_booking_with(conn, &mut ReferenceAllocator::new(prefix), new)
}

/// Check-then-insert inside one immediate transaction. The active-slot index
/// decides any race the check misses.
pub fn create_booking_with(
    conn: &mut Connection,
    references: &mut ReferenceAllocator<'_>,
    new: &NewBooking,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let style = queries::get_style(&tx, &new.style_id)?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::NotFound(format!("style {}", new.style_id)))?;

    let end_time = scheduling::end_time(new.start_time, style.duration_minutes)?;
    scheduling::check_slot_free(&tx, new.date, new.start_time)?;
    scheduling::check_opening_hours(&tx, new.date, new.start_time, style.duration_minutes)?;

    let now = Utc::now().naive_utc();
    let booking = loop {
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            reference: references.next_free(&tx)?,
            style_id: style.id.clone(),
            date: new.date,
            start_time: new.start_time,
            end_time,
            customer_name: new.customer_name.clone(),
            customer_email: new.customer_email.clone(),
            customer_phone: new.customer_phone.clone(),
            notes: new.notes.clone(),
            total_price: style.price,
            status: BookingStatus::Pending,
            confirmation_sent: false,
            created_at: now,
            updated_at: now,
        };

        match queries::insert_booking(&tx, &booking) {
            Ok(()) => break booking,
            Err(e) => match queries::unique_violation(&e) {
                Some(UniqueViolation::BookingReference) => {
                    tracing::warn!(reference = %booking.reference, "reference taken on insert");
                    continue;
                }
                Some(UniqueViolation::ActiveSlot) => return Err(AppError::SlotConflict),
                _ => return Err(e.into()),
            },
        }
    };

    tx.commit()?;

    tracing::info!(
        reference = %booking.reference,
        date = %booking.date,
        start = %queries::format_time(booking.start_time),
        "booking created"
    );
    Ok(booking)
}

// ── Lifecycle ──

/// Moves a pending booking to confirmed. Confirmed bookings are left as they
/// are; terminal bookings are never reopened.
pub fn confirm_payment(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    let booking = get_by_id(conn, booking_id)?;
    match booking.status {
        BookingStatus::Pending => {
            queries::update_booking_status(conn, booking_id, BookingStatus::Confirmed)?;
            tracing::info!(reference = %booking.reference, "booking confirmed");
            get_by_id(conn, booking_id)
        }
        BookingStatus::Confirmed => Ok(booking),
        status => {
            tracing::warn!(
                reference = %booking.reference,
                status = %status,
                "payment received for booking in terminal state, leaving status unchanged"
            );
            Ok(booking)
        }
    }
}

/// Staff-initiated change: complete, cancel or no-show.
pub fn transition_status(conn: &Connection, booking_id: &str, requested: &str) -> Result<Booking, AppError> {
    let target = BookingStatus::parse(requested)
        .ok_or_else(|| AppError::InvalidStatus(requested.to_string()))?;

    let booking = get_by_id(conn, booking_id)?;
    if !target.is_staff_target() || !booking.status.can_transition_to(target) {
        return Err(AppError::InvalidTransition {
            from: booking.status.to_string(),
            to: target.to_string(),
        });
    }

    queries::update_booking_status(conn, booking_id, target)?;
    tracing::info!(reference = %booking.reference, from = %booking.status, to = %target, "booking status changed");
    get_by_id(conn, booking_id)
}

/// Admin bookkeeping after a refund issued at the processor.
pub fn refund_payment(conn: &Connection, payment_id: &str) -> Result<Payment, AppError> {
    let payment = queries::get_payment_by_id(conn, payment_id)?
        .ok_or_else(|| AppError::NotFound(format!("payment {payment_id}")))?;

    if !queries::transition_payment_status(conn, payment_id, PaymentStatus::Completed, PaymentStatus::Refunded)? {
        return Err(AppError::InvalidTransition {
            from: payment.status.as_str().to_string(),
            to: PaymentStatus::Refunded.as_str().to_string(),
        });
    }
    tracing::info!(payment_id, booking_id = %payment.booking_id, "payment marked refunded");

    queries::get_payment_by_id(conn, payment_id)?
        .ok_or_else(|| AppError::NotFound(format!("payment {payment_id}")))
}

// ── Checkout ──

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Customer must complete payment at `checkout_url`.
    Redirect {
        payment_id: String,
        session_id: String,
        checkout_url: String,
        amount: rust_decimal::Decimal,
    },
    /// No processor configured: payment recorded as completed.
    Recorded {
        payment_id: String,
        amount: rust_decimal::Decimal,
    },
}

fn new_payment(booking: &Booking, payment_type: PaymentType, amount: rust_decimal::Decimal, currency: &str, status: PaymentStatus) -> Payment {
    let now = Utc::now().naive_utc();
    Payment {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking.id.clone(),
        amount,
        currency: currency.to_string(),
        payment_type,
        status,
        stripe_session_id: None,
        stripe_payment_intent_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub async fn start_checkout(
    state: &AppState,
    booking_id: &str,
    payment_type: PaymentType,
) -> Result<CheckoutOutcome, AppError> {
    let currency = state.config.currency.clone();

    let Some(processor) = state.processor.as_ref() else {
        let payment = {
            let mut conn = state.conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let (booking, amount) = amount_to_charge(&tx, booking_id, payment_type)?;
            let payment = new_payment(&booking, payment_type, amount, &currency, PaymentStatus::Completed);
            queries::insert_payment(&tx, &payment)?;
            confirm_payment(&tx, &booking.id)?;
            tx.commit()?;
            payment
        };
        tracing::info!(payment_id = %payment.id, amount = %payment.amount, "payment recorded without processor");

        notification::send_confirmation_if_needed(state, booking_id).await;
        return Ok(CheckoutOutcome::Recorded {
            payment_id: payment.id,
            amount: payment.amount,
        });
    };

    let (request, payment) = {
        let mut conn = state.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (booking, amount) = amount_to_charge(&tx, booking_id, payment_type)?;
        let product_name = queries::get_style(&tx, &booking.style_id)?
            .map(|s| s.name)
            .unwrap_or_else(|| "Appointment".to_string());
        let payment = new_payment(&booking, payment_type, amount, &currency, PaymentStatus::Pending);
        queries::insert_payment(&tx, &payment)?;
        tx.commit()?;

        let request = CheckoutRequest {
            payment_id: payment.id.clone(),
            booking_id: booking.id.clone(),
            reference: booking.reference.clone(),
            payment_type,
            amount,
            currency: currency.clone(),
            product_name,
            customer_email: booking.customer_email.clone(),
        };
        (request, payment)
    };

    let session = match processor.create_checkout_session(&request).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(payment_id = %payment.id, error = %e, "checkout session creation failed");
            let conn = state.conn()?;
            queries::transition_payment_status(&conn, &payment.id, PaymentStatus::Pending, PaymentStatus::Failed)?;
            return Err(AppError::Processor(e.to_string()));
        }
    };

    {
        let conn = state.conn()?;
        if let Err(e) = queries::set_payment_session(&conn, &payment.id, &session.id) {
            return Err(match queries::unique_violation(&e) {
                Some(UniqueViolation::PaymentSession) => {
                    AppError::Processor(format!("session {} already linked to another payment", session.id))
                }
                _ => e.into(),
            });
        }
    }

    Ok(CheckoutOutcome::Redirect {
        payment_id: payment.id,
        session_id: session.id,
        checkout_url: session.url,
        amount: payment.amount,
    })
}

fn amount_to_charge(
    conn: &Connection,
    booking_id: &str,
    payment_type: PaymentType,
) -> Result<(Booking, rust_decimal::Decimal), AppError> {
    let booking = get_by_id(conn, booking_id)?;
    if booking.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "booking {} is {} and can no longer be paid",
            booking.reference, booking.status
        )));
    }

    // pending checkouts hold their amount until they settle or fail
    let balance = balance_for(conn, &booking)?;
    let committed = balance.amount_paid + balance.amount_pending;
    if payment_type == PaymentType::Deposit && committed > rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "a payment for booking {} is already taken or in progress, pay the remaining balance instead",
            booking.reference
        )));
    }
    let amount = payment_type.amount_due(booking.total_price, committed);
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "nothing is owed on booking {}",
            booking.reference
        )));
    }
    Ok((booking, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Style;
    use rust_decimal::Decimal;

    fn setup() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::create_style(
            &conn,
            &Style {
                id: "knotless".to_string(),
                name: "Knotless Braids".to_string(),
                price: Decimal::new(12000, 2),
                duration_minutes: 180,
                is_active: true,
            },
        )
        .unwrap();
        conn
    }

    fn request(date: &str, start: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            style_id: "knotless".to_string(),
            date: date.to_string(),
            start_time: start.to_string(),
            customer_name: "Ada Obi".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "07123456789".to_string(),
            notes: Some("  ".to_string()),
            payment_type: None,
        }
    }

    fn new_booking(date: &str, start: &str) -> NewBooking {
        request(date, start).validate().unwrap().0
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut req = request("2025-06-01", "10:00");
        req.customer_phone = "   ".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request("2025-06-01", "10am");
        req.customer_phone = "0700".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request("2025-06-01", "10:00");
        req.payment_type = Some("crypto".to_string());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_defaults_to_deposit() {
        let (new, payment_type) = request("2025-06-01", "10:00").validate().unwrap();
        assert_eq!(payment_type, PaymentType::Deposit);
        assert!(new.notes.is_none());
    }

    #[test]
    fn test_create_booking_pending_with_end_time() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(queries::format_time(booking.end_time), "13:00");
        assert_eq!(booking.total_price, Decimal::new(12000, 2));
        assert!(booking.reference.starts_with("LAYO-"));
    }

    #[test]
    fn test_second_booking_same_slot_conflicts() {
        let mut conn = setup();
        create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();
        let err = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
    }

    #[test]
    fn test_blocked_date_creates_nothing() {
        let mut conn = setup();
        let date = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        queries::block_date(&conn, date, None, Some("Christmas")).unwrap();

        let err = create_booking(&mut conn, "LAYO", &new_booking("2025-12-25", "10:00")).unwrap_err();
        assert!(matches!(err, AppError::DateBlocked));
        assert!(queries::list_bookings(&conn, None, Some(date), 10).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_style_not_found() {
        let mut conn = setup();
        let mut new = new_booking("2025-06-01", "10:00");
        new.style_id = "missing".to_string();
        assert!(matches!(
            create_booking(&mut conn, "LAYO", &new),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_exhausted_references_fail_transiently() {
        let mut conn = setup();
        let mut first = ReferenceAllocator::with_generator("LAYO", || "AAAAAA".to_string());
        create_booking_with(&mut conn, &mut first, &new_booking("2025-06-01", "10:00")).unwrap();

        let mut stuck = ReferenceAllocator::with_generator("LAYO", || "AAAAAA".to_string());
        let err = create_booking_with(&mut conn, &mut stuck, &new_booking("2025-06-02", "10:00")).unwrap_err();
        assert!(matches!(err, AppError::ReferenceExhausted));
    }

    #[test]
    fn test_confirm_is_idempotent_and_spares_terminal() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();

        assert_eq!(confirm_payment(&conn, &booking.id).unwrap().status, BookingStatus::Confirmed);
        assert_eq!(confirm_payment(&conn, &booking.id).unwrap().status, BookingStatus::Confirmed);

        transition_status(&conn, &booking.id, "CANCELLED").unwrap();
        assert_eq!(confirm_payment(&conn, &booking.id).unwrap().status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_staff_transitions() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();

        assert!(matches!(
            transition_status(&conn, &booking.id, "archived"),
            Err(AppError::InvalidStatus(_))
        ));
        assert!(matches!(
            transition_status(&conn, &booking.id, "CONFIRMED"),
            Err(AppError::InvalidTransition { .. })
        ));

        let done = transition_status(&conn, &booking.id, "COMPLETED").unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(matches!(
            transition_status(&conn, &booking.id, "NO_SHOW"),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_frees_slot_and_keeps_row() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();
        transition_status(&conn, &booking.id, "cancelled").unwrap();

        create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();
        assert_eq!(get_by_id(&conn, &booking.id).unwrap().status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_amount_to_charge_deposit_then_balance() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();

        let (_, deposit) = amount_to_charge(&conn, &booking.id, PaymentType::Deposit).unwrap();
        assert_eq!(deposit, Decimal::new(3600, 2));

        let paid = new_payment(&booking, PaymentType::Deposit, deposit, "gbp", PaymentStatus::Completed);
        queries::insert_payment(&conn, &paid).unwrap();

        let (_, rest) = amount_to_charge(&conn, &booking.id, PaymentType::Full).unwrap();
        assert_eq!(rest, Decimal::new(8400, 2));

        let settled = new_payment(&booking, PaymentType::Full, rest, "gbp", PaymentStatus::Completed);
        queries::insert_payment(&conn, &settled).unwrap();
        assert!(matches!(
            amount_to_charge(&conn, &booking.id, PaymentType::Full),
            Err(AppError::Validation(_))
        ));
        assert_eq!(balance_for(&conn, &booking).unwrap().balance_due, Decimal::ZERO);
    }

    #[test]
    fn test_open_checkout_reserves_its_amount() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();
        let open = new_payment(&booking, PaymentType::Deposit, Decimal::new(3600, 2), "gbp", PaymentStatus::Pending);
        queries::insert_payment(&conn, &open).unwrap();

        assert!(matches!(
            amount_to_charge(&conn, &booking.id, PaymentType::Deposit),
            Err(AppError::Validation(_))
        ));
        let (_, rest) = amount_to_charge(&conn, &booking.id, PaymentType::Full).unwrap();
        assert_eq!(rest, Decimal::new(8400, 2));

        // an expired session releases what it held
        queries::transition_payment_status(&conn, &open.id, PaymentStatus::Pending, PaymentStatus::Failed).unwrap();
        let (_, deposit) = amount_to_charge(&conn, &booking.id, PaymentType::Deposit).unwrap();
        assert_eq!(deposit, Decimal::new(3600, 2));
    }

    #[test]
    fn test_refund_requires_completed_payment() {
        let mut conn = setup();
        let booking = create_booking(&mut conn, "LAYO", &new_booking("2025-06-01", "10:00")).unwrap();
        let pending = new_payment(&booking, PaymentType::Deposit, Decimal::new(3600, 2), "gbp", PaymentStatus::Pending);
        queries::insert_payment(&conn, &pending).unwrap();
        assert!(matches!(
            refund_payment(&conn, &pending.id),
            Err(AppError::InvalidTransition { .. })
        ));

        queries::complete_payment(&conn, &pending.id, Some("pi_1")).unwrap();
        let refunded = refund_payment(&conn, &pending.id).unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(balance_for(&conn, &booking).unwrap().amount_paid, Decimal::ZERO);
    }
}
