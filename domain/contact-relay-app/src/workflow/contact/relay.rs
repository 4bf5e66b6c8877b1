use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{
        SubmissionId,
        submission::{ContactForm, ContactSubmission, ValidationError},
        template::{TemplateError, render_owner_notification, render_sender_confirmation},
    },
    ports::mail::{
        MailError, MailIdentity, MailSetup, MailTimeouts, MessageId, OutgoingMail, with_timeout,
    },
};

pub const CONFIRMATION_SUBJECT: &str = "Thank you for contacting me!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    InvalidPayload,
    ValidationError,
    NotConfigured,
    TransportUnavailable,
    AuthError,
    ConnectionError,
    UnknownError,
    ConfirmationFailed,
}

impl RelayErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayErrorKind::InvalidPayload => "InvalidPayload",
            RelayErrorKind::ValidationError => "ValidationError",
            RelayErrorKind::NotConfigured => "NotConfigured",
            RelayErrorKind::TransportUnavailable => "TransportUnavailable",
            RelayErrorKind::AuthError => "AuthError",
            RelayErrorKind::ConnectionError => "ConnectionError",
            RelayErrorKind::UnknownError => "UnknownError",
            RelayErrorKind::ConfirmationFailed => "ConfirmationFailed",
        }
    }
}

impl std::fmt::Display for RelayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("mail transport unavailable: {0}")]
    TransportUnavailable(MailError),

    #[error("owner notification failed: {0}")]
    SendFailed(MailError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl RelayError {
    pub fn kind(&self) -> RelayErrorKind {
        match self {
            RelayError::InvalidPayload(_) => RelayErrorKind::InvalidPayload,
            RelayError::Validation(_) => RelayErrorKind::ValidationError,
            RelayError::TransportUnavailable(_) => RelayErrorKind::TransportUnavailable,
            RelayError::SendFailed(MailError::Auth(_)) => RelayErrorKind::AuthError,
            RelayError::SendFailed(MailError::Connection(_) | MailError::Timeout(_)) => {
                RelayErrorKind::ConnectionError
            }
            RelayError::SendFailed(_) | RelayError::Template(_) => RelayErrorKind::UnknownError,
        }
    }

    /// Message safe to show to the person submitting the form.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::InvalidPayload(_) => "Invalid JSON format".to_string(),
            RelayError::Validation(err) => err.to_string(),
            RelayError::TransportUnavailable(_) => {
                "Email service temporarily unavailable. Please try again later.".to_string()
            }
            _ => match self.kind() {
                RelayErrorKind::AuthError => {
                    "Email authentication failed. Please contact the site administrator."
                        .to_string()
                }
                RelayErrorKind::ConnectionError => {
                    "Could not connect to email server. Please try again later.".to_string()
                }
                _ => "Failed to send message. Please try again later.".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Sent(MessageId),
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The owner notification went out.
    Delivered {
        submission_id: SubmissionId,
        message_id: MessageId,
        confirmation: ConfirmationStatus,
    },
    /// Mail is not configured; the submission was written to the log instead.
    Logged { submission_id: SubmissionId },
}

impl RelayOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            RelayOutcome::Delivered { .. } => {
                "Message sent successfully! I'll get back to you soon."
            }
            RelayOutcome::Logged { .. } => {
                "Message received! Email delivery is not configured, so it was logged for manual review."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    pub send_confirmation: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            send_confirmation: true,
        }
    }
}

#[async_trait::async_trait]
pub trait RelayContactUseCase {
    /// Parses a raw JSON body and relays it.
    async fn relay(&self, body: &[u8]) -> Result<RelayOutcome, RelayError>;

    async fn relay_form(
        &self,
        form: ContactForm,
        options: RelayOptions,
    ) -> Result<RelayOutcome, RelayError>;
}

pub struct RelayContactUseCaseImpl {
    mail: MailSetup,
    timeouts: MailTimeouts,
}

impl RelayContactUseCaseImpl {
    pub fn new(mail: MailSetup, timeouts: MailTimeouts) -> Self {
        Self { mail, timeouts }
    }

    async fn deliver(
        &self,
        submission_id: SubmissionId,
        submission: &ContactSubmission,
        options: RelayOptions,
    ) -> Result<RelayOutcome, RelayError> {
        let provider = match &self.mail {
            MailSetup::Configured(provider) => provider,
            MailSetup::Unconfigured(presence) => {
                info!(
                    "[{}] SMTP not configured ({:?}), logging submission {}: {:?}",
                    RelayErrorKind::NotConfigured,
                    presence,
                    submission_id,
                    submission
                );
                return Ok(RelayOutcome::Logged { submission_id });
            }
        };

        let transport = provider
            .connect()
            .map_err(RelayError::TransportUnavailable)?;
        with_timeout(self.timeouts.verify, transport.verify())
            .await
            .map_err(RelayError::TransportUnavailable)?;
        info!("Submission {}: SMTP connection verified", submission_id);

        let identity = provider.identity();
        let owner_mail = owner_notification(identity, submission)?;
        let message_id = with_timeout(self.timeouts.send, transport.send(&owner_mail))
            .await
            .map_err(RelayError::SendFailed)?;
        info!(
            "Submission {}: owner notification sent as {}",
            submission_id, message_id
        );

        if !options.send_confirmation {
            return Ok(RelayOutcome::Delivered {
                submission_id,
                message_id,
                confirmation: ConfirmationStatus::Skipped,
            });
        }

        let confirmation = match sender_confirmation(identity, submission) {
            Ok(mail) => {
                match with_timeout(self.timeouts.confirmation, transport.send(&mail)).await {
                    Ok(confirmation_id) => {
                        info!(
                            "Submission {}: confirmation sent to {}",
                            submission_id,
                            submission.email()
                        );
                        ConfirmationStatus::Sent(confirmation_id)
                    }
                    Err(err) => {
                        warn!(
                            "[{}] Submission {}: {}",
                            RelayErrorKind::ConfirmationFailed,
                            submission_id,
                            err
                        );
                        ConfirmationStatus::Failed
                    }
                }
            }
            Err(err) => {
                warn!(
                    "[{}] Submission {}: {}",
                    RelayErrorKind::ConfirmationFailed,
                    submission_id,
                    err
                );
                ConfirmationStatus::Failed
            }
        };

        Ok(RelayOutcome::Delivered {
            submission_id,
            message_id,
            confirmation,
        })
    }
}

fn owner_notification(
    identity: &MailIdentity,
    submission: &ContactSubmission,
) -> Result<OutgoingMail, RelayError> {
    Ok(OutgoingMail {
        from_name: identity.from_name.clone(),
        from_address: identity.from_address.clone(),
        to: identity.owner_address.clone(),
        reply_to: Some(submission.email().to_string()),
        subject: format!("Portfolio Contact: {}", submission.subject()),
        html: render_owner_notification(submission, Utc::now())?,
    })
}

fn sender_confirmation(
    identity: &MailIdentity,
    submission: &ContactSubmission,
) -> Result<OutgoingMail, TemplateError> {
    Ok(OutgoingMail {
        from_name: identity.from_name.clone(),
        from_address: identity.from_address.clone(),
        to: submission.email().to_string(),
        reply_to: None,
        subject: CONFIRMATION_SUBJECT.to_string(),
        html: render_sender_confirmation(submission, &identity.from_name)?,
    })
}

/// Only a JSON object is a contact form. Derived struct deserialization would
/// also take a positional array.
fn parse_form(body: &[u8]) -> Result<ContactForm, serde_json::Error> {
    let fields: Map<String, Value> = serde_json::from_slice(body)?;
    serde_json::from_value(Value::Object(fields))
}

#[async_trait::async_trait]
impl RelayContactUseCase for RelayContactUseCaseImpl {
    async fn relay(&self, body: &[u8]) -> Result<RelayOutcome, RelayError> {
        let form = parse_form(body).map_err(|err| {
            warn!("Rejected contact payload: {}", err);
            RelayError::InvalidPayload(err.to_string())
        })?;
        self.relay_form(form, RelayOptions::default()).await
    }

    async fn relay_form(
        &self,
        form: ContactForm,
        options: RelayOptions,
    ) -> Result<RelayOutcome, RelayError> {
        let submission = ContactSubmission::try_from(form).inspect_err(|err| {
            info!("Rejected contact submission: {}", err);
        })?;
        let submission_id = Uuid::new_v4();

        match self.deliver(submission_id, &submission, options).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(
                    "[{}] Submission {} was not delivered: {}. Submission: {:?}",
                    err.kind(),
                    submission_id,
                    err,
                    submission
                );
                Err(err)
            }
        }
    }
}
