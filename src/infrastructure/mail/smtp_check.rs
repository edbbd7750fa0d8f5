//! Verifies the outgoing mail settings against the real SMTP server.

use std::time::Duration;

use anyhow::Context;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::bootstrap::config::EmailSettings;

pub type Mailer = AsyncSmtpTransport<Tokio1Executor>;

const TEST_SUBJECT: &str = "Tabbycat email configuration test";
const TEST_BODY: &str = "This message confirms that the outgoing mail settings of this \
Tabbycat site can authenticate and deliver email.\n";

/// Builds a transport that upgrades with STARTTLS when `use_tls` is set and
/// authenticates when a host user is configured.
pub fn mailer(settings: &EmailSettings, timeout: Duration) -> anyhow::Result<Mailer> {
    let builder = if settings.use_tls {
        Mailer::starttls_relay(&settings.host)
            .with_context(|| format!("tls setup for {}", settings.host))?
    } else {
        Mailer::builder_dangerous(&settings.host)
    };
    let mut builder = builder.port(settings.port).timeout(Some(timeout));
    if !settings.host_user.is_empty() {
        builder = builder.credentials(Credentials::new(
            settings.host_user.clone(),
            settings.host_password.expose().to_string(),
        ));
    }
    Ok(builder.build())
}

/// Opens a session (EHLO, STARTTLS and AUTH as configured) and closes it.
pub async fn verify(mailer: &Mailer) -> anyhow::Result<()> {
    let connected = mailer
        .test_connection()
        .await
        .context("smtp session failed")?;
    anyhow::ensure!(connected, "SMTP server closed the session");
    Ok(())
}

/// A plain-text message from `DEFAULT_FROM_EMAIL` to the same address.
pub fn test_message(settings: &EmailSettings) -> anyhow::Result<Message> {
    let sender: Mailbox = settings
        .default_from
        .parse()
        .with_context(|| format!("DEFAULT_FROM_EMAIL `{}` is not a mailbox", settings.default_from))?;
    let message = Message::builder()
        .from(sender.clone())
        .to(sender)
        .subject(TEST_SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(TEST_BODY.to_string())
        .context("build test message")?;
    Ok(message)
}

/// Sends the test message and returns the server's reply code.
pub async fn send_test(mailer: &Mailer, settings: &EmailSettings) -> anyhow::Result<String> {
    let message = test_message(settings)?;
    let response = mailer.send(message).await.context("smtp send failed")?;
    tracing::info!(to = %settings.default_from, code = %response.code(), "test_email_sent");
    Ok(response.code().to_string())
}
