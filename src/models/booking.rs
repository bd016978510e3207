use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub reference: String,
    pub style_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub notes: Option<String>,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub confirmation_sent: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    /// Accepts the stored form (`no_show`) as well as the API form (`NO_SHOW`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "no_show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }

    /// Targets staff may request. `Confirmed` is reserved for payment reconciliation.
    pub fn is_staff_target(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking input after boundary validation.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub style_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub notes: Option<String>,
}

pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!(BookingStatus::parse("NO_SHOW"), Some(BookingStatus::NoShow));
        assert_eq!(BookingStatus::parse("no_show"), Some(BookingStatus::NoShow));
        assert_eq!(BookingStatus::parse("Confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("archived"), None);
        assert_eq!(BookingStatus::parse(""), None);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn test_staff_transitions_from_open_states() {
        for from in [BookingStatus::Pending, BookingStatus::Confirmed] {
            assert!(from.can_transition_to(BookingStatus::Completed));
            assert!(from.can_transition_to(BookingStatus::NoShow));
            assert!(from.can_transition_to(BookingStatus::Cancelled));
        }
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_staff_cannot_request_confirmed() {
        assert!(!BookingStatus::Confirmed.is_staff_target());
        assert!(!BookingStatus::Pending.is_staff_target());
        assert!(BookingStatus::Cancelled.is_staff_target());
    }
}
