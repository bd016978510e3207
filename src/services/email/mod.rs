pub mod resend;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    /// Hidden copies; recipients in `to` never see these addresses.
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}
