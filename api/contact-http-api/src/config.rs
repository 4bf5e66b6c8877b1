const DEFAULT_PORT: u16 = 5000;

/// Origins of the portfolio frontend during local development.
const DEV_ORIGINS: [&str; 6] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://localhost:4173",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:4173",
];

#[derive(Debug, thiserror::Error)]
#[error("{key} must be {expected}, got '{value}'")]
pub struct HttpConfigError {
    key: &'static str,
    expected: &'static str,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub diagnostics: bool,
}

impl HttpConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HttpConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| HttpConfigError {
                key: "PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let mut allowed_origins: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        for key in ["FRONTEND_URL", "CORS_ALLOWED_ORIGINS"] {
            let Some(value) = var(key) else {
                continue;
            };
            for origin in value.split(',') {
                let origin = origin.trim().trim_end_matches('/');
                if !origin.is_empty() && !allowed_origins.iter().any(|o| o == origin) {
                    allowed_origins.push(origin.to_string());
                }
            }
        }

        let diagnostics = match var("CONTACT_DIAGNOSTICS").as_deref().map(str::trim) {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(HttpConfigError {
                    key: "CONTACT_DIAGNOSTICS",
                    expected: "true or false",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            host: var("HTTP_HOST").unwrap_or("0.0.0.0".to_string()),
            port,
            allowed_origins,
            diagnostics,
        })
    }
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
    fn test_defaults() {
        let config = HttpConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert!(!config.diagnostics);
        assert!(config.allowed_origins.contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn test_frontend_origins_are_appended() {
        let config = HttpConfig::from_lookup(lookup(&[
            ("FRONTEND_URL", "https://portfolio.example.com/"),
            (
                "CORS_ALLOWED_ORIGINS",
                "https://a.example.com, https://portfolio.example.com",
            ),
            ("PORT", "8080"),
            ("CONTACT_DIAGNOSTICS", "true"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.diagnostics);
        let extra: Vec<&String> = config.allowed_origins.iter().skip(DEV_ORIGINS.len()).collect();
        assert_eq!(extra, ["https://portfolio.example.com", "https://a.example.com"]);
    }

    #[test]
    fn test_bad_port_is_rejected() {
        assert!(HttpConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }
}
