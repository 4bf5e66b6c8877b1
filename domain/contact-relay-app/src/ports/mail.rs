use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who mail is sent as and where owner notifications go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailIdentity {
    pub from_name: String,
    pub from_address: String,
    pub owner_address: String,
}

/// Non-secret description of the relay, safe to show in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSummary {
    pub host: String,
    pub port: u16,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Smtp(String),
}

#[async_trait::async_trait]
pub trait MailTransport {
    /// Confirms the relay is reachable and accepts our credentials.
    async fn verify(&self) -> Result<(), MailError>;
    async fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError>;
}

pub type BoxMailTransport = Box<dyn MailTransport + Send + Sync + 'static>;

/// Builds a fresh transport per request from configuration loaded at startup.
pub trait MailTransportProvider {
    fn identity(&self) -> &MailIdentity;
    fn summary(&self) -> TransportSummary;
    fn connect(&self) -> Result<BoxMailTransport, MailError>;
}

pub type ArcMailTransportProvider = Arc<dyn MailTransportProvider + Send + Sync + 'static>;

/// Which SMTP settings were found when mail is not configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailSettingsPresence {
    pub host: bool,
    pub user: bool,
    pub pass: bool,
}

#[derive(Clone)]
pub enum MailSetup {
    Configured(ArcMailTransportProvider),
    Unconfigured(MailSettingsPresence),
}

impl MailSetup {
    pub fn is_configured(&self) -> bool {
        matches!(self, MailSetup::Configured(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailTimeouts {
    pub verify: Duration,
    pub send: Duration,
    pub confirmation: Duration,
}

impl Default for MailTimeouts {
    fn default() -> Self {
        Self {
            verify: Duration::from_secs(10),
            send: Duration::from_secs(15),
            confirmation: Duration::from_secs(10),
        }
    }
}

/// Runs a mail operation, failing with [`MailError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, MailError>
where
    F: Future<Output = Result<T, MailError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(MailError::Timeout(limit)),
    }
}

#[derive(Debug, Clone)]
pub enum MockBehaviour {
    Succeed,
    Fail(MailError),
    Hang,
}

impl MockBehaviour {
    async fn run(&self) -> Result<(), MailError> {
        match self {
            MockBehaviour::Succeed => Ok(()),
            MockBehaviour::Fail(err) => Err(err.clone()),
            MockBehaviour::Hang => std::future::pending().await,
        }
    }
}

/// In-memory provider recording every verify and send attempt.
#[derive(Clone)]
pub struct MockMailTransportProvider {
    identity: MailIdentity,
    connect_error: Option<MailError>,
    verify: MockBehaviour,
    sends: Arc<Mutex<VecDeque<MockBehaviour>>>,
    verify_count: Arc<Mutex<usize>>,
    send_attempts: Arc<Mutex<Vec<OutgoingMail>>>,
}

#[allow(unused)]
impl MockMailTransportProvider {
    pub fn new() -> Self {
        Self {
            identity: MailIdentity {
                from_name: "Portfolio Contact".to_string(),
                from_address: "site@example.com".to_string(),
                owner_address: "owner@example.com".to_string(),
            },
            connect_error: None,
            verify: MockBehaviour::Succeed,
            sends: Arc::new(Mutex::new(VecDeque::new())),
            verify_count: Arc::new(Mutex::new(0)),
            send_attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_error(mut self, err: MailError) -> Self {
        self.connect_error = Some(err);
        self
    }

    pub fn with_verify(mut self, behaviour: MockBehaviour) -> Self {
        self.verify = behaviour;
        self
    }

    /// Behaviours for consecutive sends. Sends past the end succeed.
    pub fn with_sends(self, behaviours: Vec<MockBehaviour>) -> Self {
        self.sends.lock().unwrap().extend(behaviours);
        self
    }

    pub fn verify_count(&self) -> usize {
        *self.verify_count.lock().unwrap()
    }

    pub fn send_attempts(&self) -> Vec<OutgoingMail> {
        self.send_attempts.lock().unwrap().clone()
    }
}

impl MailTransportProvider for MockMailTransportProvider {
    fn identity(&self) -> &MailIdentity {
        &self.identity
    }

    fn summary(&self) -> TransportSummary {
        TransportSummary {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "site@example.com".to_string(),
        }
    }

    fn connect(&self) -> Result<BoxMailTransport, MailError> {
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl MailTransport for MockMailTransportProvider {
    async fn verify(&self) -> Result<(), MailError> {
        *self.verify_count.lock().unwrap() += 1;
        self.verify.run().await
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError> {
        let attempt = {
            let mut attempts = self.send_attempts.lock().unwrap();
            attempts.push(mail.clone());
            attempts.len()
        };
        let behaviour = self
            .sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockBehaviour::Succeed);
        behaviour.run().await?;
        Ok(MessageId(format!("<mock-{}@example.com>", attempt)))
    }
}
