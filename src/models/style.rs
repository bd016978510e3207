use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub is_active: bool,
}
