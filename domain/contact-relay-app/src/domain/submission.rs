use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile")
});

/// Field names in the order they are checked and reported.
const FIELD_ORDER: [&str; 4] = ["name", "email", "subject", "message"];

/// The contact form exactly as the browser posts it. Any field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A contact form that passed validation. Only this type reaches the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    name: String,
    email: String,
    subject: String,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required: {0} is missing")]
    MissingField(&'static str),

    #[error("Invalid email format")]
    InvalidEmail,
}

#[derive(Validate)]
struct SubmissionFields {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    email: String,
    /// The address exactly as submitted. Surrounding whitespace is not trimmed
    /// away before the pattern check.
    #[validate(regex(path = *EMAIL_PATTERN))]
    email_as_sent: String,
    #[validate(length(min = 1))]
    subject: String,
    #[validate(length(min = 1))]
    message: String,
}

impl ContactSubmission {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TryFrom<ContactForm> for ContactSubmission {
    type Error = ValidationError;

    fn try_from(form: ContactForm) -> Result<Self, Self::Error> {
        let trimmed = |value: Option<String>| value.unwrap_or_default().trim().to_string();
        let email_as_sent = form.email.clone().unwrap_or_default();
        let fields = SubmissionFields {
            name: trimmed(form.name),
            email: trimmed(form.email),
            email_as_sent,
            subject: trimmed(form.subject),
            message: trimmed(form.message),
        };

        if let Err(errors) = fields.validate() {
            let field_errors = errors.field_errors();
            for field in FIELD_ORDER {
                if field_errors.contains_key(field) {
                    return Err(ValidationError::MissingField(field));
                }
                if field == "email" && field_errors.contains_key("email_as_sent") {
                    return Err(ValidationError::InvalidEmail);
                }
            }
        }

        Ok(Self {
            name: fields.name,
            email: fields.email,
            subject: fields.subject,
            message: fields.message,
        })
    }
}
