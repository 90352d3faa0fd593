use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::email::{DeliverEmail, EmailBody, EmailError, Letterhead, OutgoingEmail};

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    letterhead: Letterhead,
}

impl SmtpSender {
    pub fn with_credentials(
        username: &str,
        password: &str,
        smtp_address: &str,
        max_connections: u32,
        idle_timeout: Duration,
        letterhead: Letterhead,
    ) -> Result<Self, EmailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_address)
            .map_err(|e| EmailError::RelayUnavailable(e.to_string()))?
            .credentials(Credentials::new(
                String::from(username),
                String::from(password),
            ))
            .pool_config(
                PoolConfig::new()
                    .max_size(max_connections)
                    .idle_timeout(idle_timeout),
            )
            .build();

        Ok(Self {
            transport,
            letterhead,
        })
    }

    pub async fn test_connection(&self) -> Result<bool, EmailError> {
        self.transport
            .test_connection()
            .await
            .map_err(EmailError::DeliveryFailed)
    }
}

#[async_trait]
impl DeliverEmail for SmtpSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let content_type = if email.body.is_html() {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let message = Message::builder()
            .from(self.letterhead.from.clone())
            .reply_to(self.letterhead.reply_to.clone())
            .to(email.recipient)
            .subject(email.subject)
            .header(content_type)
            .body(match email.body {
                EmailBody::Text(content) | EmailBody::Html(content) => content,
            })
            .map_err(EmailError::MalformedMessage)?;

        self.transport
            .send(message)
            .await
            .map_err(EmailError::DeliveryFailed)?;

        Ok(())
    }
}
