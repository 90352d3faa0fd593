use async_trait::async_trait;
use std::sync::Mutex;

use crate::email::{DeliverEmail, EmailError, OutgoingEmail};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentEmail {
    pub destination: String,
    pub subject: String,
    pub body: String,
}

/// Logs messages instead of sending them. Used when email is disabled and in tests.
#[derive(Default)]
pub struct MockSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DeliverEmail for MockSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let destination = email.recipient.email.to_string();

        log::info!(
            "Email not sent (email disabled): to={} subject={}",
            destination,
            email.subject
        );

        let record = SentEmail {
            destination,
            subject: email.subject.into_owned(),
            body: String::from(email.body.content()),
        };

        match self.sent.lock() {
            Ok(mut sent) => sent.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }

        Ok(())
    }
}
