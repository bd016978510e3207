use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::{minute_of_day, weekday_index};
use crate::models::AvailabilityRule;

const MINUTES_PER_DAY: u32 = 1440;

/// Raw occupancy of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayOccupancy {
    pub blocked: bool,
    pub booked_start_times: Vec<NaiveTime>,
}

/// What the public availability endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct SlotListing {
    pub date: NaiveDate,
    pub blocked: bool,
    pub open: bool,
    pub hours: String,
    pub available: Vec<String>,
    pub booked: Vec<String>,
}

pub fn list_available_slots(conn: &Connection, date: NaiveDate) -> Result<DayOccupancy, AppError> {
    if queries::is_date_blocked(conn, date)? {
        return Ok(DayOccupancy {
            blocked: true,
            booked_start_times: vec![],
        });
    }
    Ok(DayOccupancy {
        blocked: false,
        booked_start_times: queries::booked_start_times(conn, date)?,
    })
}

/// Salon-wide rule for the date's weekday, if one was configured.
pub fn configured_rule(conn: &Connection, date: NaiveDate) -> Result<Option<AvailabilityRule>, AppError> {
    Ok(queries::get_salon_rule(conn, weekday_index(date))?)
}

pub fn slot_listing(
    conn: &Connection,
    date: NaiveDate,
    duration_minutes: i32,
) -> Result<SlotListing, AppError> {
    let occupancy = list_available_slots(conn, date)?;
    let rule = configured_rule(conn, date)?
        .unwrap_or_else(|| AvailabilityRule::default_for(weekday_index(date)));

    let available = if occupancy.blocked {
        vec![]
    } else {
        rule.candidate_slots(duration_minutes)
            .into_iter()
            .filter(|slot| !occupancy.booked_start_times.contains(slot))
            .map(|slot| queries::format_time(slot))
            .collect()
    };

    Ok(SlotListing {
        date,
        blocked: occupancy.blocked,
        open: rule.is_open && !occupancy.blocked,
        hours: rule.to_human_readable(),
        available,
        booked: occupancy
            .booked_start_times
            .iter()
            .map(|t| queries::format_time(*t))
            .collect(),
    })
}

/// Authoritative gate before a booking insert.
pub fn check_slot_free(conn: &Connection, date: NaiveDate, start: NaiveTime) -> Result<(), AppError> {
    if queries::is_date_blocked(conn, date)? {
        return Err(AppError::DateBlocked);
    }
    if queries::slot_taken(conn, date, start)? {
        return Err(AppError::SlotConflict);
    }
    Ok(())
}

/// Rejects a start that falls outside a configured opening window. Days
/// without a salon-wide rule are unrestricted.
pub fn check_opening_hours(
    conn: &Connection,
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i32,
) -> Result<(), AppError> {
    if let Some(rule) = configured_rule(conn, date)? {
        if !rule.fits(start, duration_minutes) {
            return Err(AppError::OutsideBusinessHours {
                hours: rule.to_human_readable(),
            });
        }
    }
    Ok(())
}

/// Start plus duration on the minute-of-day clock. Services that would run
/// past midnight are refused.
pub fn end_time(start: NaiveTime, duration_minutes: i32) -> Result<NaiveTime, AppError> {
    if duration_minutes <= 0 {
        return Err(AppError::Validation(
            "service duration must be positive".to_string(),
        ));
    }
    let end = minute_of_day(start) + duration_minutes as u32;
    if end >= MINUTES_PER_DAY {
        return Err(AppError::Validation(
            "this appointment would run past midnight, please pick an earlier time".to_string(),
        ));
    }
    let end = end % MINUTES_PER_DAY;
    NaiveTime::from_hms_opt(end / 60, end % 60, 0)
        .ok_or_else(|| AppError::Validation("invalid end time".to_string()))
}
