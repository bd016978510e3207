use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::AppError;
use crate::services::payments::stripe::{self, StripeEvent, WebhookAction};
use crate::services::reconciliation::{self, Reconciliation};
use crate::state::AppState;

// POST /webhook/stripe
//
// Takes the raw body: the signature covers the exact bytes Stripe sent.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let secret = &state.config.stripe_webhook_secret;
    if secret.is_empty() {
        return Err(AppError::Config("STRIPE_WEBHOOK_SECRET is not set".to_string()));
    }

    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("missing Stripe-Signature header");
            AppError::InvalidSignature("missing Stripe-Signature header".to_string())
        })?;

    stripe::verify_webhook_signature(&body, sig_header, secret, chrono::Utc::now().timestamp())
        .map_err(|e| {
            tracing::warn!(error = e, "webhook signature verification failed");
            AppError::InvalidSignature(e.to_string())
        })?;

    let event = StripeEvent::parse(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook event: {e}")))?;
    let action = event
        .action()
        .map_err(|e| AppError::Validation(format!("malformed {} event: {e}", event.event_type)))?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "received Stripe webhook");

    let result = match action {
        WebhookAction::Reconcile(signal) => reconciliation::reconcile(&state, &signal).await?,
        WebhookAction::IntentFailed { payment_id, payment_intent_id } => {
            tracing::info!(payment_id = %payment_id, payment_intent_id = %payment_intent_id, "payment intent failed");
            reconciliation::reconcile_intent_failure(&state, &payment_id).await?
        }
        WebhookAction::Ignore => {
            tracing::debug!(event_type = %event.event_type, "unhandled webhook event type");
            return Ok(Json(serde_json::json!({ "received": true, "handled": false })));
        }
    };

    if result == Reconciliation::UnknownSession {
        tracing::warn!(event_id = %event.id, "webhook referenced no known payment");
    }

    Ok(Json(serde_json::json!({ "received": true, "handled": true, "reconciliation": result })))
}
