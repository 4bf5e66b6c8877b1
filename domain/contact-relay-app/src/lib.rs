use std::sync::Arc;

use crate::{
    ports::mail::{MailSetup, MailTimeouts},
    workflow::{
        contact::relay::{RelayContactUseCase, RelayContactUseCaseImpl},
        diagnostics::test_email::{SendTestEmailUseCase, SendTestEmailUseCaseImpl},
    },
};

pub mod domain;
pub mod ports;
pub mod workflow;

pub struct Application {
    pub relay_contact_use_case: Arc<dyn RelayContactUseCase + Send + Sync + 'static>,
    pub send_test_email_use_case: Box<dyn SendTestEmailUseCase + Send + Sync + 'static>,
    pub mail_configured: bool,
}

pub fn build_application(mail: MailSetup, timeouts: MailTimeouts) -> Application {
    let relay_contact_use_case: Arc<dyn RelayContactUseCase + Send + Sync + 'static> =
        Arc::new(RelayContactUseCaseImpl::new(mail.clone(), timeouts));
    let send_test_email_use_case = Box::new(SendTestEmailUseCaseImpl::new(
        mail.clone(),
        timeouts,
        relay_contact_use_case.clone(),
    ));

    Application {
        relay_contact_use_case,
        send_test_email_use_case,
        mail_configured: mail.is_configured(),
    }
}
