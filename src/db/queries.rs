use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::models::{
    AvailabilityRule, BlockedDate, Booking, BookingStatus, Payment, PaymentStatus, PaymentType,
    Style,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

const BOOKING_COLUMNS: &str = "id, reference, style_id, date, start_time, end_time, customer_name, \
     customer_email, customer_phone, notes, total_price, status, confirmation_sent, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, currency, payment_type, status, \
     stripe_session_id, stripe_payment_intent_id, created_at, updated_at";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

// ── Constraint classification ──

/// Which unique index rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueViolation {
    ActiveSlot,
    BookingReference,
    PaymentSession,
    Other,
}

pub fn unique_violation(err: &anyhow::Error) -> Option<UniqueViolation> {
    let sqlite_err = err.downcast_ref::<rusqlite::Error>()?;
    match sqlite_err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let msg = msg.as_deref().unwrap_or("");
            if !msg.contains("UNIQUE") {
                return None;
            }
            Some(if msg.contains("bookings.date") {
                UniqueViolation::ActiveSlot
            } else if msg.contains("bookings.reference") {
                UniqueViolation::BookingReference
            } else if msg.contains("payments.stripe_session_id") {
                UniqueViolation::PaymentSession
            } else {
                UniqueViolation::Other
            })
        }
        _ => None,
    }
}

// ── Styles ──

pub fn create_style(conn: &Connection, style: &Style) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO styles (id, name, price, duration_minutes, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            style.id,
            style.name,
            style.price.to_string(),
            style.duration_minutes,
            style.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_style(conn: &Connection, id: &str) -> anyhow::Result<Option<Style>> {
    let result = conn
        .query_row(
            "SELECT id, name, price, duration_minutes, is_active FROM styles WHERE id = ?1",
            params![id],
            |row| Ok(parse_style_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_active_styles(conn: &Connection) -> anyhow::Result<Vec<Style>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, price, duration_minutes, is_active FROM styles WHERE is_active = 1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_style_row(row)))?;

    let mut styles = vec![];
    for row in rows {
        styles.push(row??);
    }
    Ok(styles)
}

fn parse_style_row(row: &rusqlite::Row) -> anyhow::Result<Style> {
    let price: String = row.get(2)?;
    Ok(Style {
        id: row.get(0)?,
        name: row.get(1)?,
        price: Decimal::from_str(&price)?,
        duration_minutes: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            booking.id,
            booking.reference,
            booking.style_id,
            format_date(booking.date),
            format_time(booking.start_time),
            format_time(booking.end_time),
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.notes,
            booking.total_price.to_string(),
            booking.status.as_str(),
            booking.confirmation_sent as i32,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn reference_exists(conn: &Connection, reference: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE reference = ?1",
        params![reference],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_booking_by_reference(
    conn: &Connection,
    reference: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE reference = ?1"),
            params![reference.trim().to_uppercase()],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Start times held by non-cancelled bookings on `date`, earliest first.
pub fn booked_start_times(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<NaiveTime>> {
    let mut stmt = conn.prepare(
        "SELECT start_time FROM bookings WHERE date = ?1 AND status != 'cancelled' ORDER BY start_time ASC",
    )?;
    let rows = stmt.query_map(params![format_date(date)], |row| row.get::<_, String>(0))?;

    let mut times = vec![];
    for row in rows {
        times.push(NaiveTime::parse_from_str(&row?, TIME_FORMAT)?);
    }
    Ok(times)
}

pub fn slot_taken(conn: &Connection, date: NaiveDate, start: NaiveTime) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE date = ?1 AND start_time = ?2 AND status != 'cancelled'",
        params![format_date(date), format_time(start)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

/// Returns false when the flag was already set.
pub fn mark_confirmation_sent(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET confirmation_sent = 1, updated_at = ?1 WHERE id = ?2 AND confirmation_sent = 0",
        params![now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    date_filter: Option<NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut clauses = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = status_filter {
        params_vec.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(date) = date_filter {
        params_vec.push(Box::new(format_date(date)));
        clauses.push(format!("date = ?{}", params_vec.len()));
    }
    params_vec.push(Box::new(limit));
    let limit_idx = params_vec.len();

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql} ORDER BY date DESC, start_time DESC LIMIT ?{limit_idx}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(3)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let price_str: String = row.get(10)?;
    let status_str: String = row.get(11)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status in store: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        reference: row.get(1)?,
        style_id: row.get(2)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FORMAT)?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FORMAT)?,
        customer_name: row.get(6)?,
        customer_email: row.get(7)?,
        customer_phone: row.get(8)?,
        notes: row.get(9)?,
        total_price: Decimal::from_str(&price_str)?,
        status,
        confirmation_sent: row.get::<_, i32>(12)? != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

// ── Payments ──

pub fn insert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            payment.id,
            payment.booking_id,
            payment.amount.to_string(),
            payment.currency,
            payment.payment_type.as_str(),
            payment.status.as_str(),
            payment.stripe_session_id,
            payment.stripe_payment_intent_id,
            payment.created_at.format(TS_FORMAT).to_string(),
            payment.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn set_payment_session(
    conn: &Connection,
    payment_id: &str,
    session_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET stripe_session_id = ?1, updated_at = ?2 WHERE id = ?3 AND stripe_session_id IS NULL",
        params![session_id, now_str(), payment_id],
    )?;
    Ok(count > 0)
}

pub fn get_payment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Payment>> {
    let result = conn
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
            params![id],
            |row| Ok(parse_payment_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_payment_by_session(
    conn: &Connection,
    session_id: &str,
) -> anyhow::Result<Option<Payment>> {
    let result = conn
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE stripe_session_id = ?1"),
            params![session_id],
            |row| Ok(parse_payment_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_payments_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = ?1 ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_payment_row(row)))?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row??);
    }
    Ok(payments)
}

/// Moves a pending or failed payment to completed. Returns false if nothing changed.
pub fn complete_payment(
    conn: &Connection,
    id: &str,
    payment_intent_id: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments
         SET status = 'completed',
             stripe_payment_intent_id = COALESCE(?1, stripe_payment_intent_id),
             updated_at = ?2
         WHERE id = ?3 AND status IN ('pending', 'failed')",
        params![payment_intent_id, now_str(), id],
    )?;
    Ok(count > 0)
}

/// Conditional status change: only applies while the payment is still in `from`.
pub fn transition_payment_status(
    conn: &Connection,
    id: &str,
    from: PaymentStatus,
    to: PaymentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now_str(), id, from.as_str()],
    )?;
    Ok(count > 0)
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let amount_str: String = row.get(2)?;
    let type_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount: Decimal::from_str(&amount_str)?,
        currency: row.get(3)?,
        payment_type: PaymentType::parse(&type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown payment type in store: {type_str}"))?,
        status: PaymentStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown payment status in store: {status_str}"))?,
        stripe_session_id: row.get(6)?,
        stripe_payment_intent_id: row.get(7)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

// ── Blocked Dates ──

/// Only salon-wide entries close the book for a date.
pub fn is_date_blocked(conn: &Connection, date: NaiveDate) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM blocked_dates WHERE date = ?1 AND stylist_id = ''",
        params![format_date(date)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn block_date(
    conn: &Connection,
    date: NaiveDate,
    stylist_id: Option<&str>,
    reason: Option<&str>,
) -> anyhow::Result<i64> {
    let stylist = stylist_id.unwrap_or("");
    conn.execute(
        "INSERT INTO blocked_dates (date, stylist_id, reason) VALUES (?1, ?2, ?3)
         ON CONFLICT(date, stylist_id) DO UPDATE SET reason = excluded.reason",
        params![format_date(date), stylist, reason],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM blocked_dates WHERE date = ?1 AND stylist_id = ?2",
        params![format_date(date), stylist],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn unblock_date(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM blocked_dates WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn list_blocked_dates(conn: &Connection) -> anyhow::Result<Vec<BlockedDate>> {
    let mut stmt = conn
        .prepare("SELECT id, date, stylist_id, reason FROM blocked_dates ORDER BY date ASC, stylist_id ASC")?;
    let rows = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        let date: String = row.get(1)?;
        let stylist_id: String = row.get(2)?;
        let reason: Option<String> = row.get(3)?;
        Ok((id, date, stylist_id, reason))
    })?;

    let mut blocked = vec![];
    for row in rows {
        let (id, date, stylist_id, reason) = row?;
        blocked.push(BlockedDate {
            id,
            date: NaiveDate::parse_from_str(&date, DATE_FORMAT)?,
            stylist_id: Some(stylist_id).filter(|s| !s.is_empty()),
            reason,
        });
    }
    Ok(blocked)
}

// ── Availability Rules ──

pub fn get_salon_rule(conn: &Connection, day_of_week: u8) -> anyhow::Result<Option<AvailabilityRule>> {
    let result = conn
        .query_row(
            "SELECT day_of_week, stylist_id, is_open, open_time, close_time
             FROM availability_rules WHERE day_of_week = ?1 AND stylist_id = ''",
            params![day_of_week],
            |row| Ok(parse_rule_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_rules(conn: &Connection) -> anyhow::Result<Vec<AvailabilityRule>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, stylist_id, is_open, open_time, close_time
         FROM availability_rules ORDER BY stylist_id ASC, day_of_week ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_rule_row(row)))?;

    let mut rules = vec![];
    for row in rows {
        rules.push(row??);
    }
    Ok(rules)
}

pub fn upsert_rule(conn: &Connection, rule: &AvailabilityRule) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO availability_rules (day_of_week, stylist_id, is_open, open_time, close_time)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(day_of_week, stylist_id) DO UPDATE SET
           is_open = excluded.is_open,
           open_time = excluded.open_time,
           close_time = excluded.close_time",
        params![
            rule.day_of_week,
            rule.stylist_id.as_deref().unwrap_or(""),
            rule.is_open as i32,
            format_time(rule.open_time),
            format_time(rule.close_time),
        ],
    )?;
    Ok(())
}

fn parse_rule_row(row: &rusqlite::Row) -> anyhow::Result<AvailabilityRule> {
    let stylist_id: String = row.get(1)?;
    let open: String = row.get(3)?;
    let close: String = row.get(4)?;
    Ok(AvailabilityRule {
        day_of_week: row.get(0)?,
        stylist_id: Some(stylist_id).filter(|s| !s.is_empty()),
        is_open: row.get::<_, i32>(2)? != 0,
        open_time: NaiveTime::parse_from_str(&open, TIME_FORMAT)?,
        close_time: NaiveTime::parse_from_str(&close, TIME_FORMAT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    pub(crate) fn seed_style(conn: &Connection) -> Style {
        let style = Style {
            id: "knotless".to_string(),
            name: "Knotless Braids".to_string(),
            price: Decimal::new(12000, 2),
            duration_minutes: 180,
            is_active: true,
        };
        create_style(conn, &style).unwrap();
        style
    }

    fn booking(reference: &str, date: &str, start: &str) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            reference: reference.to_string(),
            style_id: "knotless".to_string(),
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            start_time: NaiveTime::parse_from_str(start, TIME_FORMAT).unwrap(),
            end_time: NaiveTime::parse_from_str("13:00", TIME_FORMAT).unwrap(),
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "07000000000".to_string(),
            notes: None,
            total_price: Decimal::new(12000, 2),
            status: BookingStatus::Pending,
            confirmation_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_slot_index_rejects_second_booking() {
        let conn = db::init_db(":memory:").unwrap();
        seed_style(&conn);

        insert_booking(&conn, &booking("LAYO-AAAAAA", "2025-06-01", "10:00")).unwrap();
        let err = insert_booking(&conn, &booking("LAYO-BBBBBB", "2025-06-01", "10:00")).unwrap_err();
        assert_eq!(unique_violation(&err), Some(UniqueViolation::ActiveSlot));
    }

    #[test]
    fn test_cancelled_booking_frees_slot() {
        let conn = db::init_db(":memory:").unwrap();
        seed_style(&conn);

        let first = booking("LAYO-AAAAAA", "2025-06-01", "10:00");
        insert_booking(&conn, &first).unwrap();
        update_booking_status(&conn, &first.id, BookingStatus::Cancelled).unwrap();

        insert_booking(&conn, &booking("LAYO-BBBBBB", "2025-06-01", "10:00")).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(booked_start_times(&conn, date).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_reference_classified() {
        let conn = db::init_db(":memory:").unwrap();
        seed_style(&conn);

        insert_booking(&conn, &booking("LAYO-AAAAAA", "2025-06-01", "10:00")).unwrap();
        let err = insert_booking(&conn, &booking("LAYO-AAAAAA", "2025-06-02", "10:00")).unwrap_err();
        assert_eq!(unique_violation(&err), Some(UniqueViolation::BookingReference));
    }

    #[test]
    fn test_booking_round_trip_by_reference() {
        let conn = db::init_db(":memory:").unwrap();
        seed_style(&conn);

        let b = booking("LAYO-AB12C3", "2025-06-01", "10:00");
        insert_booking(&conn, &b).unwrap();

        let loaded = get_booking_by_reference(&conn, "layo-ab12c3").unwrap().unwrap();
        assert_eq!(loaded.id, b.id);
        assert_eq!(loaded.total_price, Decimal::new(12000, 2));
        assert_eq!(loaded.status, BookingStatus::Pending);
        assert!(get_booking_by_reference(&conn, "LAYO-ZZZZZZ").unwrap().is_none());
    }

    #[test]
    fn test_confirmation_flag_set_once() {
        let conn = db::init_db(":memory:").unwrap();
        seed_style(&conn);

        let b = booking("LAYO-AAAAAA", "2025-06-01", "10:00");
        insert_booking(&conn, &b).unwrap();
        assert!(mark_confirmation_sent(&conn, &b.id).unwrap());
        assert!(!mark_confirmation_sent(&conn, &b.id).unwrap());
    }

    #[test]
    fn test_salon_wide_block_only() {
        let conn = db::init_db(":memory:").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();

        block_date(&conn, date, Some("stylist-1"), Some("holiday")).unwrap();
        assert!(!is_date_blocked(&conn, date).unwrap());

        let id = block_date(&conn, date, None, Some("Christmas")).unwrap();
        assert!(is_date_blocked(&conn, date).unwrap());
        assert_eq!(list_blocked_dates(&conn).unwrap().len(), 2);

        assert!(unblock_date(&conn, id).unwrap());
        assert!(!is_date_blocked(&conn, date).unwrap());
    }

    #[test]
    fn test_upsert_rule_replaces_window() {
        let conn = db::init_db(":memory:").unwrap();
        let mut rule = AvailabilityRule::default_for(5);
        upsert_rule(&conn, &rule).unwrap();

        rule.is_open = false;
        upsert_rule(&conn, &rule).unwrap();

        let stored = get_salon_rule(&conn, 5).unwrap().unwrap();
        assert!(!stored.is_open);
        assert_eq!(list_rules(&conn).unwrap().len(), 1);
        assert!(get_salon_rule(&conn, 6).unwrap().is_none());
    }
}
