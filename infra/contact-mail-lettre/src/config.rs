use std::{str::FromStr, sync::Arc, time::Duration};

use contact_relay_app::ports::mail::{MailIdentity, MailSettingsPresence, MailSetup};
use lettre::Address;
use log::{info, warn};
use thiserror::Error;

use crate::LettreMailProvider;

const DEFAULT_FROM_NAME: &str = "Portfolio Contact";

const SOCKET_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("unknown SMTP_SERVICE '{0}'")]
    UnknownService(String),
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS. STARTTLS is used otherwise.
    pub secure: bool,
    pub user: String,
    pub password: String,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp: SmtpConfig,
    pub identity: MailIdentity,
}

struct WellKnownService {
    name: &'static str,
    host: &'static str,
    port: u16,
    secure: bool,
}

static WELL_KNOWN_SERVICES: [WellKnownService; 6] = [
    WellKnownService {
        name: "gmail",
        host: "smtp.gmail.com",
        port: 465,
        secure: true,
    },
    WellKnownService {
        name: "outlook",
        host: "smtp-mail.outlook.com",
        port: 587,
        secure: false,
    },
    WellKnownService {
        name: "office365",
        host: "smtp.office365.com",
        port: 587,
        secure: false,
    },
    WellKnownService {
        name: "yahoo",
        host: "smtp.mail.yahoo.com",
        port: 465,
        secure: true,
    },
    WellKnownService {
        name: "zoho",
        host: "smtp.zoho.com",
        port: 465,
        secure: true,
    },
    WellKnownService {
        name: "sendgrid",
        host: "smtp.sendgrid.net",
        port: 587,
        secure: false,
    },
];

fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value
        .as_deref()
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(_) => Err(ConfigError::InvalidValue {
            key,
            expected: "true or false",
            value: value.unwrap_or_default(),
        }),
    }
}

fn parse_address(
    key: &'static str,
    expected: &'static str,
    value: String,
) -> Result<String, ConfigError> {
    match Address::from_str(&value) {
        Ok(_) => Ok(value),
        Err(_) => Err(ConfigError::InvalidValue {
            key,
            expected,
            value,
        }),
    }
}

impl MailConfig {
    /// Reads the SMTP settings through `lookup`. When host, user or password is
    /// missing the inner result reports which of them were found.
    pub fn from_lookup<F>(lookup: F) -> Result<Result<Self, MailSettingsPresence>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let service = match var("SMTP_SERVICE") {
            Some(name) => Some(
                WELL_KNOWN_SERVICES
                    .iter()
                    .find(|service| service.name.eq_ignore_ascii_case(name.trim()))
                    .ok_or(ConfigError::UnknownService(name))?,
            ),
            None => None,
        };

        let host = var("SMTP_HOST").or(service.map(|service| service.host.to_string()));
        let user = var("SMTP_USER");
        let password = var("SMTP_PASS");
        let (Some(host), Some(user), Some(password)) = (host.clone(), user.clone(), password.clone())
        else {
            return Ok(Err(MailSettingsPresence {
                host: host.is_some(),
                user: user.is_some(),
                pass: password.is_some(),
            }));
        };

        let secure = match var("SMTP_SECURE") {
            Some(value) => parse_bool("SMTP_SECURE", Some(value))?,
            None => service.is_some_and(|service| service.secure),
        };
        let port = match var("SMTP_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "SMTP_PORT",
                expected: "a port number",
                value,
            })?,
            None => match service {
                Some(service) => service.port,
                None if secure => 465,
                None => 587,
            },
        };
        let accept_invalid_certs =
            parse_bool("SMTP_TLS_ACCEPT_INVALID_CERTS", var("SMTP_TLS_ACCEPT_INVALID_CERTS"))?;

        // Token style users such as SendGrid's `apikey` need an explicit FROM_EMAIL.
        let from_address = match var("FROM_EMAIL") {
            Some(value) => parse_address("FROM_EMAIL", "an email address", value)?,
            None => parse_address(
                "FROM_EMAIL",
                "set because SMTP_USER is not an email address",
                user.clone(),
            )?,
        };
        let owner_address = parse_address(
            "TO_EMAIL",
            "an email address",
            var("TO_EMAIL").unwrap_or(from_address.clone()),
        )?;
        let from_name = var("FROM_NAME").unwrap_or(DEFAULT_FROM_NAME.to_string());

        Ok(Ok(Self {
            smtp: SmtpConfig {
                host,
                port,
                secure,
                user,
                password,
                accept_invalid_certs,
                timeout: SOCKET_TIMEOUT,
            },
            identity: MailIdentity {
                from_name,
                from_address,
                owner_address,
            },
        }))
    }
}

/// Loads the mail configuration once at startup.
pub fn load_mail_setup<F>(lookup: F) -> Result<MailSetup, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match MailConfig::from_lookup(lookup)? {
        Ok(config) => {
            info!(
                "SMTP configured: host={} port={} secure={} user={} from={} to={}",
                config.smtp.host,
                config.smtp.port,
                config.smtp.secure,
                config.smtp.user,
                config.identity.from_address,
                config.identity.owner_address
            );
            if config.smtp.accept_invalid_certs {
                warn!("SMTP TLS certificate verification is disabled");
            }
            Ok(MailSetup::Configured(Arc::new(LettreMailProvider::new(config))))
        }
        Err(presence) => {
            warn!(
                "SMTP not configured (host: {}, user: {}, pass: {}); contact submissions will only be logged",
                presence.host, presence.user, presence.pass
            );
            Ok(MailSetup::Unconfigured(presence))
        }
    }
}
