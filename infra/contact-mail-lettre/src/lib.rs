use contact_relay_app::ports::mail::{
    BoxMailTransport, MailError, MailIdentity, MailTransport, MailTransportProvider, MessageId,
    OutgoingMail, TransportSummary,
};
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{
        self,
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use log::debug;
use uuid::Uuid;

pub mod config;

pub use config::{ConfigError, MailConfig, SmtpConfig, load_mail_setup};

/// SMTP reply codes that mean the relay rejected our credentials.
const AUTH_FAILURE_CODES: [u16; 3] = [530, 534, 535];

pub struct LettreMailProvider {
    smtp: SmtpConfig,
    identity: MailIdentity,
}

impl LettreMailProvider {
    pub fn new(config: MailConfig) -> Self {
        Self {
            smtp: config.smtp,
            identity: config.identity,
        }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let tls_parameters = TlsParameters::builder(self.smtp.host.clone())
            .dangerous_accept_invalid_certs(self.smtp.accept_invalid_certs)
            .build()
            .map_err(|e| MailError::Connection(format!("invalid TLS parameters: {}", e)))?;
        let tls = if self.smtp.secure {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Required(tls_parameters)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.smtp.host)
            .port(self.smtp.port)
            .tls(tls)
            .timeout(Some(self.smtp.timeout))
            .credentials(Credentials::new(
                self.smtp.user.clone(),
                self.smtp.password.clone(),
            ))
            .build();
        Ok(transport)
    }
}

impl MailTransportProvider for LettreMailProvider {
    fn identity(&self) -> &MailIdentity {
        &self.identity
    }

    fn summary(&self) -> TransportSummary {
        TransportSummary {
            host: self.smtp.host.clone(),
            port: self.smtp.port,
            user: self.smtp.user.clone(),
        }
    }

    fn connect(&self) -> Result<BoxMailTransport, MailError> {
        debug!(
            "Creating SMTP transport for {}:{} (secure: {})",
            self.smtp.host, self.smtp.port, self.smtp.secure
        );
        Ok(Box::new(LettreMailTransport {
            transport: self.build_transport()?,
        }))
    }
}

pub struct LettreMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait::async_trait]
impl MailTransport for LettreMailTransport {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Connection(
                "server did not accept the connection test".to_string(),
            )),
            Err(e) => Err(classify(e)),
        }
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError> {
        let (message, message_id) = build_message(mail)?;
        let response = self.transport.send(message).await.map_err(classify)?;
        debug!(
            "SMTP accepted {} with {}: {}",
            message_id,
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(message_id)
    }
}

fn parse_address(value: &str) -> Result<Address, MailError> {
    value
        .parse::<Address>()
        .map_err(|e| MailError::InvalidAddress(format!("{}: {}", value, e)))
}

fn build_message(mail: &OutgoingMail) -> Result<(Message, MessageId), MailError> {
    let from_address = parse_address(&mail.from_address)?;
    let from_name = Some(mail.from_name.clone()).filter(|name| !name.is_empty());
    let message_id = MessageId(format!("<{}@{}>", Uuid::new_v4(), from_address.domain()));

    let mut builder = Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .to(Mailbox::new(None, parse_address(&mail.to)?))
        .subject(mail.subject.clone())
        .message_id(Some(message_id.0.clone()))
        .header(ContentType::TEXT_HTML);
    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(Mailbox::new(None, parse_address(reply_to)?));
    }
    let message = builder
        .body(mail.html.clone())
        .map_err(|e| MailError::Build(e.to_string()))?;

    Ok((message, message_id))
}

fn classify(err: smtp::Error) -> MailError {
    classify_failure(
        err.status().map(u16::from),
        err.is_timeout() || err.is_tls(),
        err.is_response() || err.is_client(),
        err.to_string(),
    )
}

/// `status` is the SMTP reply code if the server answered. `connection_level`
/// covers timeouts and TLS failures, `protocol_level` errors where the
/// conversation itself went wrong.
fn classify_failure(
    status: Option<u16>,
    connection_level: bool,
    protocol_level: bool,
    detail: String,
) -> MailError {
    match status {
        Some(code) if AUTH_FAILURE_CODES.contains(&code) => MailError::Auth(detail),
        Some(_) => MailError::Smtp(detail),
        None if connection_level || !protocol_level => MailError::Connection(detail),
        None => MailError::Smtp(detail),
    }
}
