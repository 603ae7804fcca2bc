//! Degradation notice by email.
//!
//! [`MailHandler`] renders the plain-text summary and the PNG chart, packs
//! them into a `multipart/mixed` message and sends it to the provider's
//! address over SMTP. Configuration is loaded from environment variables; if
//! `SMTP_HOST` is not set, [`MailConfig::from_env`] returns `Ok(None)` and no
//! mail handler should be registered.
//!
//! The session upgrades to TLS with STARTTLS when the server offers it and
//! logs in only when credentials are configured and the server advertises a
//! supported AUTH mechanism. No connection pool is kept: every notification
//! opens its own SMTP session, which is closed again whether or not the send
//! succeeds.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, DEFAULT_MECHANISMS};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use linkwatch_core::{chart, report};

use crate::handler::{ActionHandler, DeliveryError, Notification};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Required configuration is missing or unreadable.
    #[error("Email configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// MailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS submission).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Per-command SMTP timeout.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// File name of the chart attachment.
pub const CHART_FILENAME: &str = "speed_test.png";

/// Configuration for the SMTP mail handler.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address of the subscriber.
    pub from_address: String,
    /// Address of the provider that receives the notice.
    pub recipient: String,
    /// SMTP username; defaults to the sender address.
    pub smtp_user: Option<String>,
    /// SMTP password. AUTH is only attempted when this is set.
    pub smtp_password: Option<String>,
    pub subject: String,
    /// Body template, see [`linkwatch_core::report`] for placeholders.
    pub body_template: String,
    /// Contract number quoted in the body.
    pub contract_no: String,
}

impl MailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` if `SMTP_HOST` is not set, signalling that mail
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable         | Required | Default                      |
    /// |------------------|----------|------------------------------|
    /// | `SMTP_HOST`      | yes      | --                           |
    /// | `SMTP_PORT`      | no       | `587`                        |
    /// | `SMTP_FROM`      | yes      | --                           |
    /// | `SMTP_USER`      | no       | value of `SMTP_FROM`         |
    /// | `SMTP_PASSWORD`  | no       | --                           |
    /// | `ISP_EMAIL`      | yes      | --                           |
    /// | `MAIL_SUBJECT`   | no       | built-in subject             |
    /// | `MAIL_BODY_FILE` | no       | built-in template            |
    /// | `CONTRACT_NO`    | no       | empty                        |
    pub fn from_env() -> Result<Option<Self>, EmailError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, EmailError> {
        let Some(smtp_host) = lookup("SMTP_HOST") else {
            return Ok(None);
        };
        let require = |key: &str| {
            lookup(key).ok_or_else(|| {
                EmailError::Config(format!("{key} must be set when SMTP_HOST is set"))
            })
        };

        let from_address = require("SMTP_FROM")?;
        let recipient = require("ISP_EMAIL")?;

        let body_template = match lookup("MAIL_BODY_FILE") {
            Some(path) => report::load_template(&path).map_err(|e| {
                EmailError::Config(format!("cannot read MAIL_BODY_FILE {path}: {e}"))
            })?,
            None => report::DEFAULT_BODY_TEMPLATE.to_string(),
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: lookup("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
            subject: lookup("MAIL_SUBJECT").unwrap_or_else(|| report::DEFAULT_SUBJECT.to_string()),
            contract_no: lookup("CONTRACT_NO").unwrap_or_default(),
            from_address,
            recipient,
            body_template,
        }))
    }
}

// ---------------------------------------------------------------------------
// MailHandler
// ---------------------------------------------------------------------------

/// Sends the degradation summary and chart to the provider via SMTP.
pub struct MailHandler {
    config: MailConfig,
}

impl MailHandler {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Assemble the multipart message for a notification.
    pub fn build_message(&self, notification: &Notification<'_>) -> Result<Message, DeliveryError> {
        let body = report::render_summary(
            &self.config.body_template,
            notification.snapshot,
            notification.config,
            &self.config.contract_no,
        )?;
        let png = chart::render_png(notification.snapshot, notification.config)?;

        let from: Mailbox = self.config.from_address.parse().map_err(EmailError::from)?;
        let to: Mailbox = self.config.recipient.parse().map_err(EmailError::from)?;
        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| EmailError::Build(e.to_string()))?;
        let attachment = Attachment::new(CHART_FILENAME.to_string()).body(png, octet_stream);

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(self.config.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(attachment),
            )
            .map_err(|e| EmailError::Build(e.to_string()))?;

        Ok(message)
    }

    /// Open an SMTP session, send `message` and close the session.
    ///
    /// The session is closed with `QUIT` on success and aborted (which also
    /// attempts `QUIT`) on any failure after the connection was opened.
    async fn send(&self, message: &Message) -> Result<(), EmailError> {
        let hello = ClientId::default();
        tracing::debug!(
            host = %self.config.smtp_host,
            port = self.config.smtp_port,
            "Opening SMTP session"
        );
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (self.config.smtp_host.as_str(), self.config.smtp_port),
            Some(SMTP_TIMEOUT),
            &hello,
            None,
            None,
        )
        .await?;

        match self.transmit(&mut connection, &hello, message).await {
            Ok(()) => {
                if let Err(e) = connection.quit().await {
                    tracing::warn!(error = %e, "SMTP QUIT failed after message was accepted");
                }
                Ok(())
            }
            Err(e) => {
                connection.abort().await;
                Err(e)
            }
        }
    }

    /// STARTTLS if offered, AUTH if configured and offered, then the message.
    async fn transmit(
        &self,
        connection: &mut AsyncSmtpConnection,
        hello: &ClientId,
        message: &Message,
    ) -> Result<(), EmailError> {
        if connection.can_starttls() {
            let tls = TlsParameters::new(self.config.smtp_host.clone())?;
            connection.starttls(tls, hello).await?;
            tracing::debug!("SMTP session upgraded with STARTTLS");
        }

        if let Some(credentials) = self.credentials() {
            if connection
                .server_info()
                .get_auth_mechanism(DEFAULT_MECHANISMS)
                .is_some()
            {
                connection.auth(DEFAULT_MECHANISMS, &credentials).await?;
                tracing::debug!("SMTP AUTH accepted");
            } else {
                tracing::debug!("Server offers no supported AUTH mechanism, sending without login");
            }
        }

        connection
            .send(message.envelope(), &message.formatted())
            .await?;
        Ok(())
    }

    /// Login credentials, present only when a password is configured.
    fn credentials(&self) -> Option<Credentials> {
        let password = self.config.smtp_password.clone()?;
        let user = self
            .config
            .smtp_user
            .clone()
            .unwrap_or_else(|| self.config.from_address.clone());
        Some(Credentials::new(user, password))
    }
}

#[async_trait]
impl ActionHandler for MailHandler {
    fn name(&self) -> &str {
        "mail"
    }

    async fn perform_action(&self, notification: &Notification<'_>) -> Result<(), DeliveryError> {
        let message = self.build_message(notification)?;
        self.send(&message).await?;

        tracing::info!(
            to = %self.config.recipient,
            samples = notification.snapshot.len(),
            "Degradation notice emailed"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
