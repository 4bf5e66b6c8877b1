//! HTML bodies for the mails sent on behalf of a contact submission.
//!
//! All user supplied values are escaped by askama, so a submitted `<script>`
//! tag arrives in the owner's inbox as text.

use askama::Template;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::submission::ContactSubmission;

#[derive(Debug, Error)]
#[error("failed to render {template} template: {source}")]
pub struct TemplateError {
    template: &'static str,
    #[source]
    source: askama::Error,
}

#[derive(Template)]
#[template(path = "owner_notification.html")]
struct OwnerNotificationTemplate<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message_lines: Vec<&'a str>,
    received_at: String,
}

#[derive(Template)]
#[template(path = "sender_confirmation.html")]
struct SenderConfirmationTemplate<'a> {
    name: &'a str,
    subject: &'a str,
    message_lines: Vec<&'a str>,
    signature: &'a str,
}

#[derive(Template)]
#[template(path = "test_email.html")]
struct TestEmailTemplate {
    sent_at: String,
}

fn lines(message: &str) -> Vec<&str> {
    message
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

/// Notification for the site owner. Newlines in the message become `<br>`.
pub fn render_owner_notification(
    submission: &ContactSubmission,
    received_at: DateTime<Utc>,
) -> Result<String, TemplateError> {
    OwnerNotificationTemplate {
        name: submission.name(),
        email: submission.email(),
        subject: submission.subject(),
        message_lines: lines(submission.message()),
        received_at: received_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
    .render()
    .map_err(|source| TemplateError {
        template: "owner notification",
        source,
    })
}

/// Acknowledgement sent back to whoever filled in the form.
pub fn render_sender_confirmation(
    submission: &ContactSubmission,
    signature: &str,
) -> Result<String, TemplateError> {
    SenderConfirmationTemplate {
        name: submission.name(),
        subject: submission.subject(),
        message_lines: lines(submission.message()),
        signature,
    }
    .render()
    .map_err(|source| TemplateError {
        template: "sender confirmation",
        source,
    })
}

pub fn render_test_email(sent_at: DateTime<Utc>) -> Result<String, TemplateError> {
    TestEmailTemplate {
        sent_at: sent_at.to_rfc3339(),
    }
    .render()
    .map_err(|source| TemplateError {
        template: "test email",
        source,
    })
}
