//! Outgoing customer notifications.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid recipient address `{0}`")]
    InvalidRecipient(String),

    #[error("notification to {recipient} was rejected: {reason}")]
    Rejected { recipient: String, reason: String },
}

/// Sender identity and subject formatting shared by every message.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub subject_prefix: String,
}

impl MailConfig {
    pub fn subject(&self, subject: &str) -> String {
        format!("{}{}", self.subject_prefix, subject)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str)
        -> Result<(), NotificationError>;
}

fn check_recipient(recipient: &str) -> Result<(), NotificationError> {
    let valid = recipient
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty());
    if valid {
        Ok(())
    } else {
        Err(NotificationError::InvalidRecipient(recipient.to_string()))
    }
}

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    config: MailConfig,
}

impl LogNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        check_recipient(recipient)?;
        tracing::info!(
            from = %self.config.from_address,
            to = %recipient,
            subject = %self.config.subject(subject),
            body = %body,
            "mail sent"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps messages in memory; with `failing` set every send is rejected.
#[derive(Debug)]
pub struct MemoryNotifier {
    config: MailConfig,
    outbox: Mutex<Vec<SentMessage>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            outbox: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    pub fn failing(config: MailConfig) -> Self {
        Self {
            failing: true,
            ..Self::new(config)
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        check_recipient(recipient)?;
        if self.failing {
            return Err(NotificationError::Rejected {
                recipient: recipient.to_string(),
                reason: "outbox unavailable".to_string(),
            });
        }
        self.outbox.lock().await.push(SentMessage {
            from: self.config.from_address.clone(),
            to: recipient.to_string(),
            subject: self.config.subject(subject),
            body: body.to_string(),
        });
        Ok(())
    }
}
