use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

pub const VERIFY_SUBJECT: &str = "Welcome to pensive";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("bad mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("cannot build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Sends plain-text mail through an authenticated STARTTLS relay.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, user: &str, password: &str) -> Result<Self, MailError> {
        let from: Mailbox = user.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();
        info!("Mail relay: {} as {}", host, user);
        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        info!("Sent \"{}\" to {}", subject, to);
        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Used when no SMTP
/// password is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(%to, %subject, "mail not sent (no SMTP password configured):\n{}", body);
        Ok(())
    }
}

/// Body of the verification mail for `@username`.
pub fn verification_body(username: &str, link: &str) -> String {
    format!(
        "Welcome to pensive


Your account @{username} has been created.
Please verify your e-mail by opening the link below:

{link}

The link expires in {ttl} minutes. If this is not your account, do not open it.

Enjoy your stay.


--
DO NOT REPLY
",
        ttl = pensive_crypto::token::TOKEN_TTL_MINUTES,
    )
}
