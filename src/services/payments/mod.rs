pub mod stripe;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::PaymentType;

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Network failure, rate limit or processor-side outage. Safe to retry.
    #[error("processor unavailable: {0}")]
    Transient(String),
    #[error("processor rejected request: {0}")]
    Rejected(String),
}

impl ProcessorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessorError::Transient(_))
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub payment_id: String,
    pub booking_id: String,
    pub reference: String,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub currency: String,
    pub product_name: String,
    pub customer_email: String,
}

impl CheckoutRequest {
    /// Amount in the currency's minor unit (pence, cents).
    pub fn amount_minor(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round().to_i64()
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Processor-side view of a checkout session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_intent: Option<String>,
}

impl SessionSnapshot {
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_str(), "paid" | "no_payment_required")
    }

    pub fn is_expired(&self) -> bool {
        self.status == "expired"
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProcessorError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, ProcessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: &str, payment_status: &str) -> SessionSnapshot {
        SessionSnapshot {
            id: "cs_test".to_string(),
            status: status.to_string(),
            payment_status: payment_status.to_string(),
            payment_intent: None,
        }
    }

    #[test]
    fn test_amount_minor_units() {
        let req = CheckoutRequest {
            payment_id: "p1".to_string(),
            booking_id: "b1".to_string(),
            reference: "LAYO-AB12C3".to_string(),
            payment_type: PaymentType::Deposit,
            amount: Decimal::new(3600, 2),
            currency: "gbp".to_string(),
            product_name: "Knotless Braids".to_string(),
            customer_email: "ada@example.com".to_string(),
        };
        assert_eq!(req.amount_minor(), Some(3600));
    }

    #[test]
    fn test_snapshot_paid_states() {
        assert!(snapshot("complete", "paid").is_paid());
        assert!(snapshot("complete", "no_payment_required").is_paid());
        assert!(!snapshot("open", "unpaid").is_paid());
        assert!(snapshot("expired", "unpaid").is_expired());
    }
}
