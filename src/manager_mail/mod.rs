use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use crate::config::MailParameters;

const SUBJECT_PREFIX: &str = "[tge_rdn_monitor]";

/// SMTP channel for operator alerts
///
pub struct Mail {
    sender: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl Mail {
    /// Returns a new instance of the Mail struct
    ///
    /// # Arguments
    ///
    /// * 'config' - mail configuration parameters
    pub fn new(config: &MailParameters) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.smtp_user.to_owned(), config.smtp_password.to_owned());
        let sender = SmtpTransport::relay(&config.smtp_endpoint)
            .map_err(|e| MailError::TransportError(e.to_string()))?
            .credentials(credentials)
            .build();

        let from = config.from.parse::<Mailbox>()
            .map_err(|e| MailError::AddressError(format!("from address: {}", e)))?;
        let to = config.to.parse::<Mailbox>()
            .map_err(|e| MailError::AddressError(format!("to address: {}", e)))?;

        Ok(Self { sender, from, to })
    }

    /// Sends an alert mail with the given subject and body
    ///
    /// # Arguments
    ///
    /// * 'subject' - the subject of the alert, prefixed with the monitor name
    /// * 'body' - the body of the alert
    pub fn send_alert(&self, subject: &str, body: String) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("{} {}", SUBJECT_PREFIX, subject))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::MessageError(e.to_string()))?;

        self.sender.send(&message)
            .map_err(|e| MailError::TransportError(e.to_string()))?;

        Ok(())
    }
}

/// Error depicting errors that occur while sending alert mails
///
#[derive(Debug, Error)]
pub enum MailError {
    #[error("TransportError: {0}")]
    TransportError(String),
    #[error("AddressError: {0}")]
    AddressError(String),
    #[error("MessageError: {0}")]
    MessageError(String),
}
