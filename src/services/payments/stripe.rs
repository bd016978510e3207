//! Stripe Checkout over the REST API (no SDK dependency).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{CheckoutRequest, CheckoutSession, PaymentProcessor, ProcessorError, SessionSnapshot};
use crate::services::reconciliation::{PaymentOutcome, PaymentSignal};

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeProcessor {
    secret_key: String,
    public_base_url: String,
    client: reqwest::Client,
}

impl StripeProcessor {
    pub fn new(secret_key: String, public_base_url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build Stripe HTTP client")?;
        Ok(Self {
            secret_key,
            public_base_url,
            client,
        })
    }

    fn session_form(&self, request: &CheckoutRequest) -> Result<Vec<(String, String)>, ProcessorError> {
        let unit_amount = request
            .amount_minor()
            .filter(|a| *a > 0)
            .ok_or_else(|| ProcessorError::Rejected(format!("invalid amount {}", request.amount)))?;

        let pairs = [
            ("mode", "payment".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("{} ({})", request.product_name, request.payment_type.as_str()),
            ),
            (
                "success_url",
                format!(
                    "{}/booking/success?session_id={{CHECKOUT_SESSION_ID}}",
                    self.public_base_url
                ),
            ),
            (
                "cancel_url",
                format!("{}/booking/{}", self.public_base_url, request.reference),
            ),
            ("customer_email", request.customer_email.clone()),
            ("client_reference_id", request.reference.clone()),
            ("metadata[booking_id]", request.booking_id.clone()),
            ("metadata[reference]", request.reference.clone()),
            ("metadata[payment_id]", request.payment_id.clone()),
            ("metadata[payment_type]", request.payment_type.as_str().to_string()),
            ("payment_intent_data[metadata][payment_id]", request.payment_id.clone()),
        ];
        Ok(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

#[derive(Deserialize)]
struct SessionBody {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
}

async fn read_session(resp: reqwest::Response) -> Result<SessionBody, ProcessorError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<SessionBody>()
            .await
            .map_err(|e| ProcessorError::Transient(format!("unreadable Stripe response: {e}")));
    }

    let body = resp.text().await.unwrap_or_default();
    if status.as_u16() == 429 || status.is_server_error() {
        Err(ProcessorError::Transient(format!("Stripe returned {status}: {body}")))
    } else {
        Err(ProcessorError::Rejected(format!("Stripe returned {status}: {body}")))
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let form = self.session_form(request)?;

        let resp = self
            .client
            .post(format!("{API_BASE}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", &request.payment_id)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProcessorError::Transient(e.to_string()))?;

        let session = read_session(resp).await?;
        let url = session
            .url
            .ok_or_else(|| ProcessorError::Rejected("checkout session has no url".to_string()))?;

        tracing::info!(session_id = %session.id, payment_id = %request.payment_id, "created Stripe checkout session");
        Ok(CheckoutSession { id: session.id, url })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, ProcessorError> {
        let resp = self
            .client
            .get(format!("{API_BASE}/checkout/sessions/{session_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| ProcessorError::Transient(e.to_string()))?;

        let session = read_session(resp).await?;
        Ok(SessionSnapshot {
            id: session.id,
            status: session.status.unwrap_or_default(),
            payment_status: session.payment_status.unwrap_or_default(),
            payment_intent: session.payment_intent,
        })
    }
}

// ── Webhooks ──

/// Verify a `Stripe-Signature` header (HMAC-SHA256 over `"{t}.{payload}"`).
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = vec![];
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("malformed Stripe-Signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "invalid signature timestamp")?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("signature timestamp outside tolerance");
    }

    let mac = {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    };

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("signature mismatch");
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// What a verified webhook event asks the reconciliation engine to do.
#[derive(Debug, PartialEq)]
pub enum WebhookAction {
    Reconcile(PaymentSignal),
    /// A payment intent failed; the session is found through our payment id.
    IntentFailed {
        payment_id: String,
        payment_intent_id: String,
    },
    Ignore,
}

impl StripeEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn action(&self) -> Result<WebhookAction, serde_json::Error> {
        match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: SessionObject = serde_json::from_value(self.data.object.clone())?;
                let paid = matches!(
                    session.payment_status.as_deref(),
                    Some("paid") | Some("no_payment_required")
                );
                if !paid {
                    // async methods settle later via async_payment_succeeded
                    return Ok(WebhookAction::Ignore);
                }
                Ok(WebhookAction::Reconcile(PaymentSignal {
                    session_id: session.id,
                    outcome: PaymentOutcome::Paid {
                        transaction_id: session.payment_intent,
                    },
                }))
            }
            "checkout.session.async_payment_succeeded" => {
                let session: SessionObject = serde_json::from_value(self.data.object.clone())?;
                Ok(WebhookAction::Reconcile(PaymentSignal {
                    session_id: session.id,
                    outcome: PaymentOutcome::Paid {
                        transaction_id: session.payment_intent,
                    },
                }))
            }
            "checkout.session.async_payment_failed" => {
                let session: SessionObject = serde_json::from_value(self.data.object.clone())?;
                Ok(WebhookAction::Reconcile(PaymentSignal {
                    session_id: session.id,
                    outcome: PaymentOutcome::Failed,
                }))
            }
            "checkout.session.expired" => {
                let session: SessionObject = serde_json::from_value(self.data.object.clone())?;
                Ok(WebhookAction::Reconcile(PaymentSignal {
                    session_id: session.id,
                    outcome: PaymentOutcome::Expired,
                }))
            }
            "payment_intent.payment_failed" => {
                let intent: PaymentIntentObject =
                    serde_json::from_value(self.data.object.clone())?;
                match intent.metadata.get("payment_id") {
                    Some(payment_id) => Ok(WebhookAction::IntentFailed {
                        payment_id: payment_id.clone(),
                        payment_intent_id: intent.id,
                    }),
                    None => Ok(WebhookAction::Ignore),
                }
            }
            _ => Ok(WebhookAction::Ignore),
        }
    }
}

/// Builds a header Stripe would send for `payload`. Used by tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
