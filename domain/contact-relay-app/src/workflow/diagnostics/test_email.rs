use std::sync::Arc;

use chrono::Utc;
use log::{error, info};

use crate::{
    domain::{submission::ContactForm, template::render_test_email},
    ports::mail::{
        MailIdentity, MailSettingsPresence, MailSetup, MailTimeouts, MessageId, OutgoingMail,
        TransportSummary, with_timeout,
    },
    workflow::contact::relay::{
        RelayContactUseCase, RelayError, RelayOptions, RelayOutcome,
    },
};

#[derive(Debug)]
pub enum TestEmailReport {
    NotConfigured(MailSettingsPresence),
    Sent {
        message_id: MessageId,
        transport: TransportSummary,
        identity: MailIdentity,
    },
    Failed(RelayError),
}

#[async_trait::async_trait]
pub trait SendTestEmailUseCase {
    /// Verifies the relay and sends a short test mail to the owner.
    async fn send_test_email(&self) -> TestEmailReport;

    /// Relays a fixed sample submission through the regular contact path.
    async fn send_test_contact(&self) -> TestEmailReport;
}

pub struct SendTestEmailUseCaseImpl {
    mail: MailSetup,
    timeouts: MailTimeouts,
    relay: Arc<dyn RelayContactUseCase + Send + Sync + 'static>,
}

impl SendTestEmailUseCaseImpl {
    pub fn new(
        mail: MailSetup,
        timeouts: MailTimeouts,
        relay: Arc<dyn RelayContactUseCase + Send + Sync + 'static>,
    ) -> Self {
        Self {
            mail,
            timeouts,
            relay,
        }
    }
}

fn sample_form() -> ContactForm {
    ContactForm {
        name: Some("Test User".to_string()),
        email: Some("test@example.com".to_string()),
        subject: Some("Test Contact Form Message".to_string()),
        message: Some(
            "This is a test message from the contact form to verify email delivery.".to_string(),
        ),
    }
}

#[async_trait::async_trait]
impl SendTestEmailUseCase for SendTestEmailUseCaseImpl {
    async fn send_test_email(&self) -> TestEmailReport {
        let provider = match &self.mail {
            MailSetup::Configured(provider) => provider,
            MailSetup::Unconfigured(presence) => return TestEmailReport::NotConfigured(*presence),
        };

        let transport = match provider.connect() {
            Ok(transport) => transport,
            Err(err) => return TestEmailReport::Failed(RelayError::TransportUnavailable(err)),
        };
        if let Err(err) = with_timeout(self.timeouts.verify, transport.verify()).await {
            error!("Test email: SMTP verification failed: {}", err);
            return TestEmailReport::Failed(RelayError::TransportUnavailable(err));
        }

        let identity = provider.identity();
        let html = match render_test_email(Utc::now()) {
            Ok(html) => html,
            Err(err) => return TestEmailReport::Failed(err.into()),
        };
        let mail = OutgoingMail {
            from_name: identity.from_name.clone(),
            from_address: identity.from_address.clone(),
            to: identity.owner_address.clone(),
            reply_to: None,
            subject: "Portfolio Email Test".to_string(),
            html,
        };

        match with_timeout(self.timeouts.send, transport.send(&mail)).await {
            Ok(message_id) => {
                info!("Test email sent as {}", message_id);
                TestEmailReport::Sent {
                    message_id,
                    transport: provider.summary(),
                    identity: identity.clone(),
                }
            }
            Err(err) => {
                error!("Test email failed: {}", err);
                TestEmailReport::Failed(RelayError::SendFailed(err))
            }
        }
    }

    async fn send_test_contact(&self) -> TestEmailReport {
        let provider = match &self.mail {
            MailSetup::Configured(provider) => provider,
            MailSetup::Unconfigured(presence) => return TestEmailReport::NotConfigured(*presence),
        };

        let options = RelayOptions {
            send_confirmation: false,
        };
        match self.relay.relay_form(sample_form(), options).await {
            Ok(RelayOutcome::Delivered { message_id, .. }) => TestEmailReport::Sent {
                message_id,
                transport: provider.summary(),
                identity: provider.identity().clone(),
            },
            Ok(RelayOutcome::Logged { .. }) => {
                TestEmailReport::NotConfigured(MailSettingsPresence::default())
            }
            Err(err) => TestEmailReport::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ports::mail::{MailError, MockBehaviour, MockMailTransportProvider},
        workflow::contact::relay::{RelayContactUseCaseImpl, RelayErrorKind},
    };

    use super::*;

    fn use_case(mail: MailSetup) -> SendTestEmailUseCaseImpl {
        let relay = Arc::new(RelayContactUseCaseImpl::new(
            mail.clone(),
            MailTimeouts::default(),
        ));
        SendTestEmailUseCaseImpl::new(mail, MailTimeouts::default(), relay)
    }

    #[tokio::test]
    async fn test_reports_presence_when_unconfigured() {
        let presence = MailSettingsPresence {
            host: true,
            user: true,
            pass: false,
        };
        let report = use_case(MailSetup::Unconfigured(presence))
            .send_test_email()
            .await;
        assert!(matches!(report, TestEmailReport::NotConfigured(p) if p == presence));
    }

    #[tokio::test]
    async fn test_sends_test_mail_to_owner() {
        let provider = MockMailTransportProvider::new();
        let report = use_case(MailSetup::Configured(Arc::new(provider.clone())))
            .send_test_email()
            .await;

        assert!(matches!(report, TestEmailReport::Sent { .. }));
        let sent = provider.send_attempts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
        assert_eq!(sent[0].subject, "Portfolio Email Test");
        assert!(sent[0].html.contains("Email Test Successful!"));
    }

    #[tokio::test]
    async fn test_verify_failure_is_reported() {
        let provider = MockMailTransportProvider::new()
            .with_verify(MockBehaviour::Fail(MailError::Auth("535".to_string())));
        let report = use_case(MailSetup::Configured(Arc::new(provider.clone())))
            .send_test_email()
            .await;

        let TestEmailReport::Failed(err) = report else {
            panic!("expected failure");
        };
        assert_eq!(err.kind(), RelayErrorKind::TransportUnavailable);
        assert!(provider.send_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_sample_contact_skips_confirmation() {
        let provider = MockMailTransportProvider::new();
        let report = use_case(MailSetup::Configured(Arc::new(provider.clone())))
            .send_test_contact()
            .await;

        assert!(matches!(report, TestEmailReport::Sent { .. }));
        let sent = provider.send_attempts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Portfolio Contact: Test Contact Form Message");
        assert_eq!(sent[0].reply_to.as_deref(), Some("test@example.com"));
    }
}
