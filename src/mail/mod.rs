//! Outbound email.
//!
//! Delivery goes through the [`Mailer`] trait. Without a configured mail
//! endpoint the server uses [`LogMailer`], which only records what would
//! have been sent.

pub mod http;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::schema::MailConfig;

pub use self::http::HttpMailer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail API rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail delivery not configured, message logged only"
        );
        Ok(())
    }
}

/// Pick a mailer for the configuration.
pub fn mailer_from_config(config: &MailConfig, timeout: Duration) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpMailer::new(
            endpoint.clone(),
            config.api_key.clone(),
            timeout,
        )?)),
        None => Ok(Arc::new(LogMailer)),
    }
}
