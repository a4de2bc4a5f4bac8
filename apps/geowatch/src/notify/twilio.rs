//! Twilio Messages API sink (SMS and WhatsApp).
//!
//! `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json` with form
//! fields `To`, `From`, `Body` and basic auth. The returned message `sid`
//! becomes the delivery id.

use super::{DeliveryId, NotificationSink, NotifyError};
use crate::config::TwilioConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Per-request ceiling, independent of the dispatcher's timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    message: String,
}

/// Sends alerts through Twilio.
#[derive(Debug, Clone)]
pub struct TwilioSink {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioSink {
    pub fn new(config: &TwilioConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            messages_url: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.api_base, config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for TwilioSink {
    async fn send(&self, body: &str, recipient: &str) -> Result<DeliveryId, NotifyError> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", recipient), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResource>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await?;
        Ok(DeliveryId(resource.sid))
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}
