//! Outgoing email: message builders plus the delivery seam.

use parking_lot::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait Mailer {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Drops every message. Used when no provider is configured.
pub struct NoopMailer;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl Mailer for NoopMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::debug!(to = %message.to_email, subject = %message.subject, "mail provider not configured; message dropped");
        Ok(())
    }
}

/// Keeps sent messages in memory; can be switched to fail every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if *self.failing.lock() {
            return Err(Error::Mail("recording mailer set to fail".to_string()));
        }
        self.sent.lock().push(message);
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn invitation_email(
    to_email: &str,
    organisation_name: &str,
    invited_by: &str,
    invite_link: &str,
) -> EmailMessage {
    let subject = format!("Join {organisation_name}");
    let text = format!(
        "{invited_by} has invited you to join the {organisation_name} team.\n\n\
         Accept the invitation: {invite_link}\n\n\
         If you were not expecting this invitation, you can ignore this email."
    );
    let html = format!(
        "<p><strong>{}</strong> has invited you to join the <strong>{}</strong> team.</p>\
         <p><a href=\"{}\">Accept invitation</a></p>\
         <p>If you were not expecting this invitation, you can ignore this email.</p>",
        escape_html(invited_by),
        escape_html(organisation_name),
        escape_html(invite_link),
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: None,
        subject,
        html,
        text,
    }
}

pub fn revoked_invitation_email(to_email: &str, organisation_name: &str) -> EmailMessage {
    let subject = format!("Invitation to join {organisation_name} revoked");
    let text = format!(
        "Your invitation to join {organisation_name} has been revoked.\n\n\
         If you think this is a mistake, contact the person who invited you."
    );
    let html = format!(
        "<p>Your invitation to join <strong>{}</strong> has been revoked.</p>\
         <p>If you think this is a mistake, contact the person who invited you.</p>",
        escape_html(organisation_name),
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: None,
        subject,
        html,
        text,
    }
}

pub fn feedback_email(
    to_email: &str,
    organisation_name: &str,
    from_name: &str,
    from_email: &str,
    category: &str,
    message: &str,
) -> EmailMessage {
    let subject = format!("Feedback ({category}) from {organisation_name}");
    let text = format!(
        "Organisation: {organisation_name}\nUser: {from_name} <{from_email}>\nCategory: {category}\n\n{message}"
    );
    let html = format!(
        "<p>Organisation: {}<br/>User: {} &lt;{}&gt;<br/>Category: {}</p><p>{}</p>",
        escape_html(organisation_name),
        escape_html(from_name),
        escape_html(from_email),
        escape_html(category),
        escape_html(message).replace('\n', "<br/>"),
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: None,
        subject,
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_email_escapes_names() {
        let msg = invitation_email(
            "new@example.com",
            "Acme <Labs>",
            "Ada",
            "https://crm.test/invitations/request/t1",
        );
        assert_eq!(msg.subject, "Join Acme <Labs>");
        assert!(msg.html.contains("Acme &lt;Labs&gt;"));
        assert!(msg.text.contains("https://crm.test/invitations/request/t1"));
    }

    #[tokio::test]
    async fn recording_mailer_can_fail() {
        let mailer = RecordingMailer::new();
        mailer
            .send(revoked_invitation_email("a@example.com", "Acme"))
            .await
            .unwrap();
        mailer.set_failing(true);
        assert!(mailer
            .send(revoked_invitation_email("b@example.com", "Acme"))
            .await
            .is_err());
        assert_eq!(mailer.sent().len(), 1);
    }
}
