use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Balance, BookingStatus, Payment, PaymentStatus};
use crate::services::booking;
use crate::services::notification;
use crate::services::payments::ProcessorError;
use crate::services::retry::retry_with_backoff;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid { transaction_id: Option<String> },
    Expired,
    Failed,
}

/// A processor report about one checkout session, from a webhook or a
/// verification lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSignal {
    pub session_id: String,
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Reconciliation {
    UnknownSession,
    Completed { booking_id: String, balance: Balance },
    AlreadyReconciled { booking_id: String, balance: Balance },
    MarkedFailed { booking_id: String },
    Unchanged { booking_id: String, status: PaymentStatus },
}

impl Reconciliation {
    /// Booking whose confirmation should go out after this result.
    fn paid_booking(&self) -> Option<&str> {
        match self {
            Reconciliation::Completed { booking_id, .. }
            | Reconciliation::AlreadyReconciled { booking_id, .. } => Some(booking_id),
            _ => None,
        }
    }
}

/// Read-check-write of one payment under an immediate transaction. Concurrent
/// signals for the same session serialize here.
pub fn apply_signal(conn: &mut Connection, signal: &PaymentSignal) -> Result<Reconciliation, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(payment) = queries::get_payment_by_session(&tx, &signal.session_id)? else {
        tracing::warn!(session_id = %signal.session_id, "signal for unknown checkout session, ignoring");
        return Ok(Reconciliation::UnknownSession);
    };

    let result = match (payment.status, &signal.outcome) {
        (PaymentStatus::Completed, PaymentOutcome::Paid { .. }) => {
            tracing::info!(payment_id = %payment.id, "payment already reconciled");
            Reconciliation::AlreadyReconciled {
                booking_id: payment.booking_id.clone(),
                balance: balance_of(&tx, &payment)?,
            }
        }
        (PaymentStatus::Pending | PaymentStatus::Failed, PaymentOutcome::Paid { transaction_id }) => {
            queries::complete_payment(&tx, &payment.id, transaction_id.as_deref())?;
            booking::confirm_payment(&tx, &payment.booking_id)?;
            let balance = balance_of(&tx, &payment)?;
            tracing::info!(
                payment_id = %payment.id,
                amount = %payment.amount,
                balance_due = %balance.balance_due,
                "payment completed"
            );
            Reconciliation::Completed {
                booking_id: payment.booking_id.clone(),
                balance,
            }
        }
        (PaymentStatus::Pending, PaymentOutcome::Expired | PaymentOutcome::Failed) => {
            queries::transition_payment_status(&tx, &payment.id, PaymentStatus::Pending, PaymentStatus::Failed)?;
            tracing::info!(payment_id = %payment.id, outcome = ?signal.outcome, "payment failed");
            Reconciliation::MarkedFailed {
                booking_id: payment.booking_id.clone(),
            }
        }
        (status, outcome) => {
            tracing::debug!(payment_id = %payment.id, status = status.as_str(), ?outcome, "signal does not change payment");
            Reconciliation::Unchanged {
                booking_id: payment.booking_id.clone(),
                status,
            }
        }
    };

    tx.commit()?;
    Ok(result)
}

fn balance_of(conn: &Connection, payment: &Payment) -> Result<Balance, AppError> {
    let booking = booking::get_by_id(conn, &payment.booking_id)?;
    booking::balance_for(conn, &booking)
}

/// Applies a signal and sends the confirmation when the payment is settled.
pub async fn reconcile(state: &AppState, signal: &PaymentSignal) -> Result<Reconciliation, AppError> {
    let result = {
        let mut conn = state.conn()?;
        apply_signal(&mut conn, signal)?
    };

    if let Some(booking_id) = result.paid_booking() {
        notification::send_confirmation_if_needed(state, booking_id).await;
    }
    Ok(result)
}

/// `payment_intent.payment_failed` carries our payment id, not the session.
pub async fn reconcile_intent_failure(state: &AppState, payment_id: &str) -> Result<Reconciliation, AppError> {
    let session_id = {
        let conn = state.conn()?;
        queries::get_payment_by_id(&conn, payment_id)?.and_then(|p| p.stripe_session_id)
    };

    match session_id {
        Some(session_id) => {
            reconcile(
                state,
                &PaymentSignal {
                    session_id,
                    outcome: PaymentOutcome::Failed,
                },
            )
            .await
        }
        None => {
            tracing::warn!(payment_id, "payment intent failure for unknown payment, ignoring");
            Ok(Reconciliation::UnknownSession)
        }
    }
}

// ── Synchronous verification ──

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub session_id: String,
    pub paid: bool,
    pub payment_status: PaymentStatus,
    pub reference: String,
    pub booking_status: BookingStatus,
    pub total_price: rust_decimal::Decimal,
    pub amount_paid: rust_decimal::Decimal,
    pub balance_due: rust_decimal::Decimal,
}

fn verification_result(conn: &Connection, session_id: &str) -> Result<(VerificationResult, String), AppError> {
    let payment = queries::get_payment_by_session(conn, session_id)?
        .ok_or_else(|| AppError::NotFound(format!("checkout session {session_id}")))?;
    let booking = booking::get_by_id(conn, &payment.booking_id)?;
    let balance = booking::balance_for(conn, &booking)?;

    Ok((
        VerificationResult {
            session_id: session_id.to_string(),
            paid: payment.status == PaymentStatus::Completed,
            payment_status: payment.status,
            reference: booking.reference,
            booking_status: booking.status,
            total_price: balance.total_price,
            amount_paid: balance.amount_paid,
            balance_due: balance.balance_due,
        },
        booking.id,
    ))
}

/// Client-driven fallback for a webhook that has not arrived yet.
pub async fn verify_session(state: &AppState, session_id: &str) -> Result<VerificationResult, AppError> {
    let (local, booking_id) = {
        let conn = state.conn()?;
        verification_result(&conn, session_id)?
    };

    if local.paid {
        // webhook got here first; the flag keeps this from sending twice
        notification::send_confirmation_if_needed(state, &booking_id).await;
        return Ok(local);
    }

    let processor = state
        .processor
        .as_ref()
        .ok_or_else(|| AppError::Config("no payment processor configured".to_string()))?;

    let policy = state.verify_retry_policy();
    let snapshot = retry_with_backoff(&policy, ProcessorError::is_transient, move || {
        processor.retrieve_session(session_id)
    })
    .await
    .map_err(|e| match e {
        ProcessorError::Transient(msg) => {
            tracing::warn!(session_id, error = %msg, "verification retries exhausted");
            AppError::VerificationUnavailable
        }
        ProcessorError::Rejected(msg) => AppError::Processor(msg),
    })?;

    let outcome = if snapshot.is_paid() {
        Some(PaymentOutcome::Paid {
            transaction_id: snapshot.payment_intent.clone(),
        })
    } else if snapshot.is_expired() {
        Some(PaymentOutcome::Expired)
    } else {
        None
    };

    match outcome {
        Some(outcome) => {
            reconcile(
                state,
                &PaymentSignal {
                    session_id: session_id.to_string(),
                    outcome,
                },
            )
            .await?;
        }
        None => {
            tracing::info!(session_id, payment_status = %snapshot.payment_status, "session still awaiting payment");
        }
    }

    let conn = state.conn()?;
    Ok(verification_result(&conn, session_id)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use rust_decimal::Decimal;

    use crate::db;
    use crate::models::{Booking, PaymentType, Style};

    struct Fixture {
        conn: Connection,
        booking_id: String,
        payment_id: String,
    }

    fn fixture() -> Fixture {
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

        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: "booking-1".to_string(),
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
            status: BookingStatus::Pending,
            confirmation_sent: false,
            created_at: now,
            updated_at: now,
        };
        queries::insert_booking(&conn, &booking).unwrap();

        let payment = Payment {
            id: "pay-1".to_string(),
            booking_id: booking.id.clone(),
            amount: Decimal::new(3600, 2),
            currency: "gbp".to_string(),
            payment_type: PaymentType::Deposit,
            status: PaymentStatus::Pending,
            stripe_session_id: Some("cs_test_1".to_string()),
            stripe_payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };
        queries::insert_payment(&conn, &payment).unwrap();

        Fixture {
            conn,
            booking_id: booking.id,
            payment_id: payment.id,
        }
    }

    fn paid() -> PaymentSignal {
        PaymentSignal {
            session_id: "cs_test_1".to_string(),
            outcome: PaymentOutcome::Paid {
                transaction_id: Some("pi_1".to_string()),
            },
        }
    }

    fn signal(outcome: PaymentOutcome) -> PaymentSignal {
        PaymentSignal {
            session_id: "cs_test_1".to_string(),
            outcome,
        }
    }

    #[test]
    fn test_paid_completes_and_confirms() {
        let mut f = fixture();
        let result = apply_signal(&mut f.conn, &paid()).unwrap();

        match result {
            Reconciliation::Completed { balance, .. } => {
                assert_eq!(balance.amount_paid, Decimal::new(3600, 2));
                assert_eq!(balance.balance_due, Decimal::new(8400, 2));
            }
            other => panic!("unexpected {other:?}"),
        }

        let payment = queries::get_payment_by_id(&f.conn, &f.payment_id).unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.stripe_payment_intent_id.as_deref(), Some("pi_1"));
        let booking = queries::get_booking_by_id(&f.conn, &f.booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_repeated_paid_is_idempotent() {
        let mut f = fixture();
        apply_signal(&mut f.conn, &paid()).unwrap();
        let second = apply_signal(&mut f.conn, &paid()).unwrap();
        assert!(matches!(second, Reconciliation::AlreadyReconciled { .. }));

        let payments = queries::list_payments_for_booking(&f.conn, &f.booking_id).unwrap();
        let completed = payments.iter().filter(|p| p.status == PaymentStatus::Completed).count();
        assert_eq!(completed, 1);
    }

    #[test]
    fn test_expired_marks_failed_booking_stays_pending() {
        let mut f = fixture();
        let result = apply_signal(&mut f.conn, &signal(PaymentOutcome::Expired)).unwrap();
        assert!(matches!(result, Reconciliation::MarkedFailed { .. }));

        let payment = queries::get_payment_by_id(&f.conn, &f.payment_id).unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        let booking = queries::get_booking_by_id(&f.conn, &f.booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        let again = apply_signal(&mut f.conn, &signal(PaymentOutcome::Failed)).unwrap();
        assert!(matches!(again, Reconciliation::Unchanged { status: PaymentStatus::Failed, .. }));
    }

    #[test]
    fn test_paid_after_failure_completes() {
        let mut f = fixture();
        apply_signal(&mut f.conn, &signal(PaymentOutcome::Failed)).unwrap();
        let result = apply_signal(&mut f.conn, &paid()).unwrap();
        assert!(matches!(result, Reconciliation::Completed { .. }));
    }

    #[test]
    fn test_late_expiry_does_not_undo_payment() {
        let mut f = fixture();
        apply_signal(&mut f.conn, &paid()).unwrap();
        let result = apply_signal(&mut f.conn, &signal(PaymentOutcome::Expired)).unwrap();
        assert!(matches!(result, Reconciliation::Unchanged { status: PaymentStatus::Completed, .. }));
    }

    #[test]
    fn test_unknown_session_is_noop() {
        let mut f = fixture();
        let result = apply_signal(
            &mut f.conn,
            &PaymentSignal {
                session_id: "cs_unknown".to_string(),
                outcome: PaymentOutcome::Paid { transaction_id: None },
            },
        )
        .unwrap();
        assert_eq!(result, Reconciliation::UnknownSession);
    }

    #[test]
    fn test_refunded_payment_ignores_paid() {
        let mut f = fixture();
        apply_signal(&mut f.conn, &paid()).unwrap();
        queries::transition_payment_status(&f.conn, &f.payment_id, PaymentStatus::Completed, PaymentStatus::Refunded)
            .unwrap();

        let result = apply_signal(&mut f.conn, &paid()).unwrap();
        assert!(matches!(result, Reconciliation::Unchanged { status: PaymentStatus::Refunded, .. }));
    }
}
