use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Deposit,
    Full,
}

/// Share of the total price taken upfront for a deposit (30%).
pub fn deposit_rate() -> Decimal {
    Decimal::new(30, 2)
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(PaymentType::Deposit),
            "full" => Some(PaymentType::Full),
            _ => None,
        }
    }

    /// Amount to charge now. A full payment settles whatever is still owed.
    pub fn amount_due(&self, total_price: Decimal, amount_paid: Decimal) -> Decimal {
        let outstanding = (total_price - amount_paid).max(Decimal::ZERO);
        let amount = match self {
            PaymentType::Deposit => (total_price * deposit_rate()).min(outstanding),
            PaymentType::Full => outstanding,
        };
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Money position of a booking derived from its completed payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub total_price: Decimal,
    pub amount_paid: Decimal,
    /// Held by checkout sessions that have not settled yet.
    pub amount_pending: Decimal,
    pub balance_due: Decimal,
}

impl Balance {
    pub fn from_payments(total_price: Decimal, payments: &[Payment]) -> Self {
        let amount_paid: Decimal = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();
        let amount_pending: Decimal = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
            .map(|p| p.amount)
            .sum();
        let outstanding = total_price - amount_paid;
        Self {
            total_price,
            amount_paid,
            amount_pending,
            // keep the price's scale so a settled booking reads 0.00
            balance_due: if outstanding.is_sign_negative() {
                Decimal::new(0, total_price.scale())
            } else {
                outstanding
            },
        }
    }
}
