pub mod senders;
pub mod templates;

use async_trait::async_trait;
use lettre::message::Mailbox;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::email::templates::PasswordResetMessage;

#[derive(Debug)]
pub enum EmailError {
    InvalidRecipient(String),
    RelayUnavailable(String),
    MalformedMessage(lettre::error::Error),
    DeliveryFailed(lettre::transport::smtp::Error),
}

impl std::error::Error for EmailError {}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::InvalidRecipient(address) => {
                write!(f, "EmailError: Cannot send to \"{address}\"")
            }
            EmailError::RelayUnavailable(e) => write!(f, "EmailError: SMTP relay unavailable: {e}"),
            EmailError::MalformedMessage(e) => write!(f, "EmailError: Malformed message: {e}"),
            EmailError::DeliveryFailed(e) => write!(f, "EmailError: Delivery failed: {e}"),
        }
    }
}

/// The addresses WorkChat mail is sent from and answered to.
#[derive(Clone, Debug)]
pub struct Letterhead {
    pub from: Mailbox,
    pub reply_to: Mailbox,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmailBody {
    Text(String),
    Html(String),
}

impl EmailBody {
    pub fn content(&self) -> &str {
        match self {
            EmailBody::Text(content) | EmailBody::Html(content) => content,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, EmailBody::Html(_))
    }
}

/// A message addressed to one WorkChat user. Senders add their letterhead.
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub recipient: Mailbox,
    pub subject: Cow<'static, str>,
    pub body: EmailBody,
}

impl OutgoingEmail {
    pub fn new(
        address: &str,
        subject: impl Into<Cow<'static, str>>,
        body: EmailBody,
    ) -> Result<Self, EmailError> {
        let recipient = address
            .parse()
            .map_err(|_| EmailError::InvalidRecipient(String::from(address)))?;

        Ok(Self {
            recipient,
            subject: subject.into(),
            body,
        })
    }

    pub fn password_reset(
        address: &str,
        app_url: &str,
        reset_token: &str,
        token_lifetime: Duration,
    ) -> Result<Self, EmailError> {
        Self::new(
            address,
            "WorkChat Password Reset",
            EmailBody::Html(PasswordResetMessage::generate(
                app_url,
                reset_token,
                token_lifetime,
            )),
        )
    }
}

#[async_trait]
pub trait DeliverEmail: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

pub type EmailSender = Box<dyn DeliverEmail>;
