use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::MailConfig,
    errors::{Error, Result},
};

const SEND_FAILED: &str = "Send failed";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    /// Base64 encoded file body.
    pub content: String,
    pub content_type: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

pub fn mailer_for(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.api_key {
        Some(api_key) => Arc::new(ResendMailer::new(api_key.clone(), config.endpoint.clone())),
        None => {
            warn!("RESEND_API_KEY not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Posts messages to the Resend HTTP API.
pub struct ResendMailer {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Deserialize, Debug, Default)]
struct ProviderError {
    message: Option<String>,
}

impl ResendMailer {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            info!("mail \"{}\" accepted for {:?}", email.subject, email.to);
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderError>(&body)
            .unwrap_or_default()
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| SEND_FAILED.to_string());
        warn!("mail provider answered {status}: {message}");
        Err(Error::MailRejected(message))
    }
}

/// Stand-in used when no provider key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        info!(
            "mail \"{}\" to {:?} ({} attachment(s)) not sent: no provider configured",
            email.subject,
            email.to,
            email.attachments.len()
        );
        Ok(())
    }
}
