// service/notification_service.rs
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    mail::{
        mails::{status_updated_email, ticket_assigned_email, ticket_created_email},
        sendmail::{Email, Mailer},
    },
    models::{
        ticketmodel::{Ticket, TicketStatus},
        usermodel::User,
    },
};

/// Best-effort email delivery. Each message is handed to a background task;
/// the caller gets the task handle and is free to drop it. Failures are
/// logged and never reach the request that triggered them.
#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn submit(&self, email: Email) -> JoinHandle<()> {
        let mailer = self.mailer.clone();

        tokio::spawn(async move {
            match mailer.send(&email).await {
                Ok(()) => tracing::debug!("Notification delivered to {}", email.to),
                Err(e) => tracing::error!(
                    "❌ Email sending error for {} ({}): {}",
                    email.to,
                    email.subject,
                    e
                ),
            }
        })
    }

    pub fn notify_ticket_created(&self, owner: &User, ticket: &Ticket) -> JoinHandle<()> {
        tracing::info!("Ticket created notification: ticket {} owner {}", ticket.id, owner.id);
        self.submit(ticket_created_email(owner, ticket))
    }

    pub fn notify_ticket_assigned(&self, assignee: &User, ticket: &Ticket) -> JoinHandle<()> {
        tracing::info!(
            "Ticket assignment notification: agent {} assigned to ticket {}",
            assignee.id,
            ticket.id
        );
        self.submit(ticket_assigned_email(assignee, ticket))
    }

    pub fn notify_status_updated(
        &self,
        owner: &User,
        ticket: &Ticket,
        status: TicketStatus,
    ) -> JoinHandle<()> {
        tracing::info!(
            "Status update notification: ticket {} is now {}",
            ticket.id,
            status.to_str()
        );
        self.submit(status_updated_email(owner, ticket, status))
    }
}

#[cfg(test)]
pub mod testing {
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::mail::sendmail::{Email, MailError, Mailer};

    /// Forwards every sent message to a channel the test can await.
    pub struct RecordingMailer {
        sender: mpsc::UnboundedSender<Email>,
    }

    impl RecordingMailer {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<Email>) {
            let (sender, receiver) = mpsc::unbounded_channel();
            (RecordingMailer { sender }, receiver)
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> Result<(), MailError> {
            let _ = self.sender.send(email.clone());
            Ok(())
        }
    }

    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    pub async fn next_email(receiver: &mut mpsc::UnboundedReceiver<Email>) -> Option<Email> {
        tokio::time::timeout(std::time::Duration::from_secs(2), receiver.recv())
            .await
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{next_email, FailingMailer, RecordingMailer};
    use super::*;

    fn email() -> Email {
        Email {
            to: "owner@example.com".to_string(),
            subject: "subject".to_string(),
            text: "text".to_string(),
            html: "<p>text</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn submitted_email_is_delivered() {
        let (mailer, mut inbox) = RecordingMailer::new();
        let notifier = NotificationService::new(Arc::new(mailer));

        notifier.submit(email());

        let delivered = next_email(&mut inbox).await.unwrap();
        assert_eq!(delivered, email());
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let notifier = NotificationService::new(Arc::new(FailingMailer));
        let handle = notifier.submit(email());

        assert!(handle.await.is_ok());
    }
}
