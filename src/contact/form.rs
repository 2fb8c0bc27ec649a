use std::{sync::Mutex, time::Duration};

use tokio::sync::watch;
use tracing::{info, warn};

use super::{
    client::ContactClient,
    notification::{Notifier, RequestStatus, DISMISS_AFTER},
};
use crate::{
    models::{ContactResponse, Message},
    validation::{validate, ValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Rejected before any request; shown inline next to the form.
    Invalid(ValidationError),
    /// An earlier submission is still in flight.
    AlreadyPending,
    /// Accepted by the server. The body is `None` when it was not the
    /// expected JSON; the message was still delivered.
    Sent(Option<ContactResponse>),
    Failed(String),
}

/// The contact form: three inputs plus the status of the last submission.
pub struct ContactForm {
    client: ContactClient,
    fields: Mutex<Message>,
    notifier: Notifier,
}

impl ContactForm {
    pub fn new(client: ContactClient) -> Self {
        Self::with_dismiss_after(client, DISMISS_AFTER)
    }

    pub fn with_dismiss_after(client: ContactClient, dismiss_after: Duration) -> Self {
        Self {
            client,
            fields: Mutex::new(Message::new("", "", "")),
            notifier: Notifier::new(dismiss_after),
        }
    }

    pub fn fill(&self, email: &str, name: &str, message: &str) {
        if let Ok(mut fields) = self.fields.lock() {
            *fields = Message::new(email, name, message);
        }
    }

    pub fn fields(&self) -> Message {
        self.fields
            .lock()
            .map(|f| f.clone())
            .unwrap_or_else(|_| Message::new("", "", ""))
    }

    #[cfg(test)]
    pub fn status(&self) -> RequestStatus {
        self.notifier.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestStatus> {
        self.notifier.subscribe()
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let message = self.fields();
        if let Err(reason) = validate(&message.email, &message.name, &message.message) {
            return SubmitOutcome::Invalid(reason);
        }

        if !self.notifier.begin() {
            return SubmitOutcome::AlreadyPending;
        }

        match self.client.send(&message).await {
            Ok(response) => {
                info!(endpoint = self.client.endpoint(), "contact message sent");
                self.fill("", "", "");
                self.notifier.finish(RequestStatus::Success);
                SubmitOutcome::Sent(response)
            }
            Err(e) => {
                warn!(endpoint = self.client.endpoint(), error = %e, "contact message failed");
                let text = e.user_message();
                self.notifier.finish(RequestStatus::Error(text.clone()));
                SubmitOutcome::Failed(text)
            }
        }
    }
}
