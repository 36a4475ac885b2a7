//! Email alert transport over SMTP with STARTTLS.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::alert::{Alert, AlertError, AlertTransport};
use crate::config::SmtpSettings;

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, AlertError> {
        let from: Mailbox = settings
            .sender
            .parse()
            .map_err(|e| AlertError::Build(format!("invalid sender address '{}': {e}", settings.sender)))?;
        let to: Mailbox = settings
            .recipient
            .parse()
            .map_err(|e| AlertError::Build(format!("invalid recipient address '{}': {e}", settings.recipient)))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            .map_err(|e| AlertError::Transport(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(settings.sender.clone(), settings.password.clone()))
            .build();

        Ok(Self { mailer, from, to })
    }

    fn message(&self, alert: &Alert) -> Result<Message, AlertError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body())
            .map_err(|e| AlertError::Build(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AlertTransport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let message = self.message(alert)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| AlertError::Transport(e.to_string()))?;
        Ok(())
    }
}
