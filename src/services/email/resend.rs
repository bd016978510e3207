use anyhow::Context;
use async_trait::async_trait;

use super::{EmailMessage, EmailSender};

const RESEND_URL: &str = "https://api.resend.com/emails";

pub struct ResendEmailSender {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        anyhow::ensure!(!self.api_key.is_empty(), "RESEND_API_KEY is not configured");

        let mut body = serde_json::json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
        });
        if !message.bcc.is_empty() {
            body["bcc"] = serde_json::json!(message.bcc);
        }

        self.client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to send email via Resend")?
            .error_for_status()
            .context("Resend API returned error")?;

        tracing::info!(to = ?message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}
