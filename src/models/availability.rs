use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::booking::hhmm;

const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Opening hours for one weekday. `day_of_week` counts from Monday = 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub day_of_week: u8,
    #[serde(default)]
    pub stylist_id: Option<String>,
    pub is_open: bool,
    #[serde(with = "hhmm")]
    pub open_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub close_time: NaiveTime,
}

impl AvailabilityRule {
    /// Window used when no rule has been configured for a weekday.
    pub fn default_for(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            stylist_id: None,
            is_open: true,
            open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.day_of_week > 6 {
            anyhow::bail!("invalid day_of_week: {}", self.day_of_week);
        }
        if self.is_open && self.open_time >= self.close_time {
            anyhow::bail!(
                "open time {} must be before close time {}",
                self.open_time.format("%H:%M"),
                self.close_time.format("%H:%M")
            );
        }
        Ok(())
    }

    /// Hourly start times from opening whose service finishes by closing.
    pub fn candidate_slots(&self, duration_minutes: i32) -> Vec<NaiveTime> {
        if !self.is_open {
            return vec![];
        }
        let open = minute_of_day(self.open_time);
        let close = minute_of_day(self.close_time);
        let duration = duration_minutes.max(1) as u32;

        (open..close)
            .step_by(60)
            .filter(|start| start + duration <= close)
            .filter_map(|start| NaiveTime::from_hms_opt(start / 60, start % 60, 0))
            .collect()
    }

    pub fn fits(&self, start: NaiveTime, duration_minutes: i32) -> bool {
        let start = minute_of_day(start);
        self.is_open
            && start >= minute_of_day(self.open_time)
            && start + duration_minutes.max(0) as u32 <= minute_of_day(self.close_time)
    }

    pub fn to_human_readable(&self) -> String {
        let day = capitalize(DAY_NAMES[usize::from(self.day_of_week.min(6))]);
        if !self.is_open {
            return format!("{day}: closed");
        }
        format!(
            "{day}: {}-{}",
            self.open_time.format("%H:%M"),
            self.close_time.format("%H:%M")
        )
    }
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

pub fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + c.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn rule(open: &str, close: &str) -> AvailabilityRule {
        AvailabilityRule {
            day_of_week: 0,
            stylist_id: None,
            is_open: true,
            open_time: t(open),
            close_time: t(close),
        }
    }

    #[test]
    fn test_parse_rule_json() {
        let json = r#"{"day_of_week":2,"is_open":true,"open_time":"10:00","close_time":"16:00"}"#;
        let rule: AvailabilityRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.day_of_week, 2);
        assert_eq!(rule.open_time, t("10:00"));
        assert!(rule.stylist_id.is_none());
    }

    #[test]
    fn test_parse_invalid_time() {
        let json = r#"{"day_of_week":2,"is_open":true,"open_time":"25:00","close_time":"16:00"}"#;
        assert!(serde_json::from_str::<AvailabilityRule>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        assert!(rule("17:00", "09:00").validate().is_err());
        assert!(rule("09:00", "17:00").validate().is_ok());
        let mut bad_day = rule("09:00", "17:00");
        bad_day.day_of_week = 7;
        assert!(bad_day.validate().is_err());
    }

    #[test]
    fn test_candidate_slots_respect_duration() {
        let slots = rule("09:00", "13:00").candidate_slots(90);
        // 12:00 + 90min would run past 13:00
        assert_eq!(slots, vec![t("09:00"), t("10:00"), t("11:00")]);
    }

    #[test]
    fn test_closed_day_has_no_slots() {
        let mut closed = rule("09:00", "17:00");
        closed.is_open = false;
        assert!(closed.candidate_slots(60).is_empty());
        assert!(!closed.fits(t("10:00"), 60));
    }

    #[test]
    fn test_fits_window() {
        let r = rule("09:00", "17:00");
        assert!(r.fits(t("09:00"), 60));
        assert!(r.fits(t("16:00"), 60));
        assert!(!r.fits(t("16:30"), 60));
        assert!(!r.fits(t("08:00"), 60));
    }

    #[test]
    fn test_weekday_index() {
        // 2025-06-16 is a Monday, 2025-06-01 a Sunday
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()), 0);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()), 6);
    }

    #[test]
    fn test_to_human_readable() {
        let mut r = rule("09:00", "17:00");
        r.day_of_week = 4;
        assert_eq!(r.to_human_readable(), "Fri: 09:00-17:00");
        r.is_open = false;
        assert_eq!(r.to_human_readable(), "Fri: closed");
    }
}
