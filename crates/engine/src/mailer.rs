//! Outbound e-mail notifications.
//!
//! The engine only knows the [`Mailer`] trait. Two implementations are
//! provided:
//!
//! - [`LogMailer`]: writes the message to the log, used when no SMTP server
//!   is configured;
//! - [`SmtpMailer`]: delivers through an SMTP relay with `lettre`.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use serde::Deserialize;
use thiserror::Error;

use crate::MoneyCents;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("cannot build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp failure: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A plain-text e-mail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// Confirmation sent to a user after a successful purchase.
    pub fn purchase_confirmation(
        to: &str,
        buyer_name: &str,
        book_title: &str,
        price: MoneyCents,
    ) -> Self {
        Self {
            to: to.to_string(),
            subject: "Book Purchase Confirmation".to_string(),
            body: format!(
                "Dear {buyer_name},\n\nYou have successfully purchased \"{book_title}\" for {price}.\n\nThank you for your purchase!"
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Mailer that only logs what it would send.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "mail delivery disabled, message not sent"
        );
        tracing::debug!("{}", email.body);
        Ok(())
    }
}

/// SMTP relay settings.
#[derive(Clone, Debug, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address, e.g. `Library <noreply@example.com>`.
    pub from: String,
    /// Use STARTTLS. Disable only for local test relays.
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from.parse()?;
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!("mail relay configured: {}:{}", config.host, config.port);
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .body(email.body.clone())?;
        self.transport.send(message).await?;
        tracing::info!(to = %email.to, "mail sent");
        Ok(())
    }
}
