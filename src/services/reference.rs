use rand::Rng;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;

pub const MAX_ATTEMPTS: usize = 5;
const CODE_LEN: usize = 6;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn format_reference(prefix: &str, code: &str) -> String {
    format!("{}-{}", prefix.to_uppercase(), code)
}

/// Hands out candidate references under a shared attempt budget. Both a
/// collision found by lookup and an insert that loses on the unique index
/// consume an attempt.
pub struct ReferenceAllocator<'a> {
    prefix: String,
    remaining: usize,
    draw: Box<dyn FnMut() -> String + 'a>,
}

impl<'a> ReferenceAllocator<'a> {
    pub fn new(prefix: &str) -> Self {
        Self::with_generator(prefix, random_code)
    }

    pub fn with_generator(prefix: &str, draw: impl FnMut() -> String + 'a) -> Self {
        Self {
            prefix: prefix.to_string(),
            remaining: MAX_ATTEMPTS,
            draw: Box::new(draw),
        }
    }

    /// Next reference not present in the store.
    pub fn next_free(&mut self, conn: &Connection) -> Result<String, AppError> {
        while self.remaining > 0 {
            self.remaining -= 1;
            let candidate = format_reference(&self.prefix, &(self.draw)());
            if !queries::reference_exists(conn, &candidate)? {
                return Ok(candidate);
            }
            tracing::debug!(reference = %candidate, "reference collision, drawing again");
        }
        tracing::error!(prefix = %self.prefix, "booking reference attempts exhausted");
        Err(AppError::ReferenceExhausted)
    }
}
