//! Alert delivery for data-quality findings and fatal pipeline failures.
//!
//! Every alert is logged as a warning. When sender, receiver, and SMTP
//! server are all configured, the alert is additionally delivered by email;
//! delivery failures are logged and never propagated.

use crate::config::AlertConfig;
use anyhow::Context;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info, warn};

pub fn send_alert(config: &AlertConfig, subject: &str, issues: &[String]) {
    let body = format!(
        "The following issues were detected during the Telco DWH ETL process:\n\n{}",
        issues
            .iter()
            .map(|issue| format!("- {issue}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
    warn!("ALERT TRIGGERED: Subject: {subject}\nBody:\n{body}");

    let (Some(sender), Some(receiver), Some(server)) =
        (&config.sender, &config.receiver, &config.smtp_server)
    else {
        warn!("Email alert configuration (sender, receiver, server) is incomplete. Alert not sent via email.");
        return;
    };

    info!(
        "Attempting to send alert email to {receiver} via {server}:{}",
        config.smtp_port
    );
    match send_email(config, sender, receiver, server, subject, body) {
        Ok(()) => info!("Alert email successfully sent to {receiver}"),
        Err(e) => error!("Failed to send alert email: {e:#}"),
    }
}

fn send_email(
    config: &AlertConfig,
    sender: &str,
    receiver: &str,
    server: &str,
    subject: &str,
    body: String,
) -> anyhow::Result<()> {
    let mut message = Message::builder()
        .from(sender.parse::<Mailbox>().context("invalid sender address")?)
        .subject(subject);
    for address in receiver.split(',') {
        message = message.to(address
            .trim()
            .parse::<Mailbox>()
            .context("invalid receiver address")?);
    }
    let email = message.body(body)?;

    let mut transport = SmtpTransport::builder_dangerous(server).port(config.smtp_port);
    if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
        transport = transport.credentials(Credentials::new(user.clone(), password.clone()));
    }
    transport.build().send(&email)?;
    Ok(())
}
