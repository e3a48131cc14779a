use async_trait::async_trait;
use serde::Deserialize;

use super::{NotifyError, SmsSender};
use crate::config::TwilioConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

impl TwilioSms {
    /// `None` si falta alguna de las credenciales o el número de origen.
    pub fn from_config(client: reqwest::Client, config: &TwilioConfig) -> Option<Self> {
        Some(Self {
            client,
            account_sid: config.account_sid.clone()?,
            auth_token: config.auth_token.clone()?,
            from_number: config.from_number.clone()?,
        })
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, self.account_sid);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Twilio {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let message: MessageResource = response.json().await?;
        tracing::info!(to, sid = %message.sid, "SMS sent");
        Ok(())
    }
}
