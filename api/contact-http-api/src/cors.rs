use axum::http::{
    HeaderValue, Method,
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        CONTENT_TYPE, VARY,
    },
};
use tower_http::cors::{AllowOrigin, CorsLayer};

const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Origin allow-list shared by the server router and the function adapter.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
    any_origin: bool,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        let any_origin = origins.iter().any(|origin| origin == "*");
        Self {
            origins,
            any_origin,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.any_origin || self.origins.iter().any(|allowed| allowed == origin)
    }

    pub fn layer(&self) -> CorsLayer {
        let allow_origin = if self.any_origin {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(
                self.origins
                    .iter()
                    .filter_map(|origin| HeaderValue::from_str(origin).ok()),
            )
        };
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(ALLOWED_METHODS)
            .allow_headers([CONTENT_TYPE])
    }

    /// CORS response headers for a request from `origin`, for adapters that
    /// build responses by hand.
    pub fn headers(&self, origin: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                ACCESS_CONTROL_ALLOW_METHODS.to_string(),
                ALLOWED_METHODS
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            (
                ACCESS_CONTROL_ALLOW_HEADERS.to_string(),
                CONTENT_TYPE.to_string(),
            ),
        ];
        if self.any_origin {
            headers.push((ACCESS_CONTROL_ALLOW_ORIGIN.to_string(), "*".to_string()));
        } else {
            headers.push((VARY.to_string(), "origin".to_string()));
            if let Some(origin) = origin.filter(|origin| self.allows(origin)) {
                headers.push((ACCESS_CONTROL_ALLOW_ORIGIN.to_string(), origin.to_string()));
            }
        }
        headers
    }
}
