// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound transactional email.
//!
//! Delivery is fire-and-forget: sends happen on a spawned task, failures
//! are logged, and nothing about delivery is surfaced to the HTTP caller.

use crate::config::Config;
use anyhow::Context;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP mail sender. Without a configured relay, messages are logged only.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer from config. An unset SMTP_RELAY yields a log-only
    /// mailer (local development).
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .mail_from
            .parse()
            .context("MAIL_FROM is not a valid mailbox")?;

        let transport = match &config.smtp_relay {
            Some(relay) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
                    .context("failed building SMTP transport")?;
                if !config.smtp_username.is_empty() {
                    builder = builder.credentials(Credentials::new(
                        config.smtp_username.clone(),
                        config.smtp_password.clone(),
                    ));
                }
                Some(builder.build())
            }
            None => {
                tracing::warn!("SMTP_RELAY not set; outbound mail will be logged only");
                None
            }
        };

        Ok(Self { transport, from })
    }

    /// Create a log-only mailer for tests.
    pub fn new_mock() -> Self {
        Self {
            transport: None,
            from: "Plateful <no-reply@plateful.app>"
                .parse()
                .expect("static mailbox"),
        }
    }

    /// Enqueue a plain-text message.
    pub fn send(&self, to: &str, subject: &str, body: &str) {
        let Ok(to_mailbox) = to.parse::<Mailbox>() else {
            tracing::warn!(to, "Refusing to send mail to unparseable address");
            return;
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
        {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, to, "Failed to build mail message");
                return;
            }
        };

        match &self.transport {
            None => {
                tracing::info!(to, subject, "Mail transport disabled; message logged only");
            }
            Some(transport) => {
                let transport = transport.clone();
                let to = to.to_string();
                tokio::spawn(async move {
                    if let Err(e) = transport.send(message).await {
                        tracing::error!(error = %e, to, "Failed to send mail");
                    }
                });
            }
        }
    }
}
