//! Outbound email for contact form submissions.
//!
//! Delivery sits behind [`EmailSender`] so a real provider can be plugged in
//! at startup. The default sender for local dev is [`LogEmailSender`], which
//! logs the message and returns `Ok(())`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

pub const CONTACT_SENDER: &str = "noreply@shipsmind.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub from_email: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    /// Contact form notification; inputs are expected to be sanitized already.
    #[must_use]
    pub fn contact_submission(
        recipient: &str,
        name: &str,
        email: &str,
        message: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let message = message.filter(|m| !m.is_empty()).unwrap_or("No message provided");
        Self {
            to_email: recipient.to_string(),
            from_email: CONTACT_SENDER.to_string(),
            reply_to: Some(email.to_string()),
            subject: format!("New Contact Form Submission from {name}"),
            html_body: format!(
                "<h2>New Contact Form Submission</h2>\
                 <p><strong>Name:</strong> {name}</p>\
                 <p><strong>Email:</strong> {email}</p>\
                 <p><strong>Message:</strong></p>\
                 <p>{message}</p>\
                 <hr><p><small>Submitted at: {}</small></p>",
                submitted_at.to_rfc3339()
            ),
        }
    }
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to fail the request.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            from_email = %message.from_email,
            subject = %message.subject,
            body = %message.html_body,
            "contact email send stub"
        );
        Ok(())
    }
}
