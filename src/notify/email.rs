use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{EmailSender, NotifyError};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// `None` si falta el host o el usuario SMTP.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Self>, NotifyError> {
        let (Some(host), Some(user)) = (config.host.as_deref(), config.user.as_deref()) else {
            return Ok(None);
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(config.port)
            .credentials(Credentials::new(
                user.to_string(),
                config.pass.clone().unwrap_or_default(),
            ))
            .build();

        let from_email = config.from_email.as_deref().unwrap_or(user);
        let from = Mailbox::new(Some(config.from_name.clone()), from_email.parse()?);

        Ok(Some(Self { transport, from }))
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}
