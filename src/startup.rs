use std::sync::Arc;

use contact_http_api::{HttpConfig, HttpConfigError};
use contact_mail_lettre::{ConfigError, load_mail_setup};
use contact_relay_app::{Application, build_application, ports::mail::MailTimeouts};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("mail configuration: {0}")]
    Mail(#[from] ConfigError),

    #[error("http configuration: {0}")]
    Http(#[from] HttpConfigError),
}

pub struct Startup {
    pub app: Arc<Application>,
    pub http: HttpConfig,
}

/// Reads all configuration once and wires the application together.
pub fn compose<F>(lookup: F) -> Result<Startup, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let mail = load_mail_setup(&lookup)?;
    let http = HttpConfig::from_lookup(&lookup)?;
    let app = Arc::new(build_application(mail, MailTimeouts::default()));
    Ok(Startup { app, http })
}

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_starts_in_logging_mode() {
        let startup = compose(lookup(&[])).unwrap();
        assert!(!startup.app.mail_configured);
        assert_eq!(startup.http.port, 5000);
        assert!(!startup.http.diagnostics);
    }

    #[test]
    fn test_full_environment() {
        let startup = compose(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "me@example.com"),
            ("SMTP_PASS", "secret"),
            ("PORT", "8080"),
            ("FRONTEND_URL", "https://portfolio.example.com/"),
        ]))
        .unwrap();
        assert!(startup.app.mail_configured);
        assert_eq!(startup.http.port, 8080);
        assert!(
            startup
                .http
                .allowed_origins
                .contains(&"https://portfolio.example.com".to_string())
        );
    }

    #[test]
    fn test_bad_values_fail_startup() {
        assert!(matches!(
            compose(lookup(&[("PORT", "http")])),
            Err(StartupError::Http(_))
        ));
        assert!(matches!(
            compose(lookup(&[("SMTP_SERVICE", "carrier-pigeon")])),
            Err(StartupError::Mail(_))
        ));
    }
}
