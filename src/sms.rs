use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, instrument};

use crate::config::SmsConfig;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("sms request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sms gateway returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound SMS delivery. Failures are reported to the caller, never retried.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), SmsError>;
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioGateway {
    client: Client,
    options: SmsConfig,
}

impl TwilioGateway {
    /// A hung gateway surfaces as `SmsError::Transport` after `timeout_secs`.
    pub fn new(options: SmsConfig) -> Result<Self, SmsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;
        Ok(Self { client, options })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.options.api_base.trim_end_matches('/'),
            self.options.account_sid
        )
    }
}

#[async_trait]
impl NotificationGateway for TwilioGateway {
    #[instrument(skip(self, body))]
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let form = [
            ("To", to),
            ("From", self.options.from_number.as_str()),
            ("Body", body),
        ];
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "twilio rejected message");
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("sms dispatched");
        Ok(())
    }
}
