use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::handlers;
use salonbook::services::email::resend::ResendEmailSender;
use salonbook::services::payments::stripe::StripeProcessor;
use salonbook::services::payments::PaymentProcessor;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let processor: Option<Box<dyn PaymentProcessor>> = if config.payments_enabled() {
        if config.stripe_webhook_secret.is_empty() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET is not set, webhooks will be rejected");
        }
        tracing::info!(currency = %config.currency, "using Stripe checkout");
        Some(Box::new(StripeProcessor::new(
            config.stripe_secret_key.clone(),
            config.public_base_url.clone(),
        )?))
    } else {
        tracing::warn!("STRIPE_SECRET_KEY is not set, payments will be recorded as completed");
        None
    };

    if config.resend_api_key.is_empty() {
        tracing::warn!("RESEND_API_KEY is not set, confirmation emails will not be delivered");
    }
    let email = ResendEmailSender::new(config.resend_api_key.clone(), config.email_from.clone());

    let state = Arc::new(AppState::new(conn, config.clone(), processor, Box::new(email)));

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
