use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDate {
    pub id: i64,
    pub date: NaiveDate,
    /// `None` blocks the whole salon.
    pub stylist_id: Option<String>,
    pub reason: Option<String>,
}
