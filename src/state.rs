use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::email::EmailSender;
use crate::services::payments::PaymentProcessor;
use crate::services::retry::RetryPolicy;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    /// `None` runs the offline flow: payments are recorded as completed at checkout.
    pub processor: Option<Box<dyn PaymentProcessor>>,
    pub email: Box<dyn EmailSender>,
    /// Booking ids with a confirmation email currently being sent.
    pub notifications_in_flight: Mutex<HashSet<String>>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        processor: Option<Box<dyn PaymentProcessor>>,
        email: Box<dyn EmailSender>,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            processor,
            email,
            notifications_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Locks the connection. Never hold the guard across an `.await`.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }

    pub fn verify_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.verify_max_attempts,
            Duration::from_millis(self.config.verify_initial_backoff_ms),
        )
    }
}
