use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub public_base_url: String,
    pub business_name: String,
    pub currency: String,
    pub reference_prefix: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub resend_api_key: String,
    pub email_from: String,
    /// Copied on every confirmation when set.
    pub business_email: Option<String>,
    pub verify_max_attempts: usize,
    pub verify_initial_backoff_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Layo Hair Studio".to_string()),
            currency: env::var("CURRENCY")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|_| "gbp".to_string()),
            reference_prefix: env::var("REFERENCE_PREFIX").unwrap_or_else(|_| "LAYO".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "bookings@localhost".to_string()),
            business_email: env::var("BUSINESS_EMAIL").ok().filter(|v| !v.is_empty()),
            verify_max_attempts: env::var("VERIFY_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(3),
            verify_initial_backoff_ms: env::var("VERIFY_INITIAL_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
        }
    }

    /// Without a secret key bookings are paid "offline": payments are recorded
    /// as completed straight away.
    pub fn payments_enabled(&self) -> bool {
        !self.stripe_secret_key.is_empty()
    }
}
