use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue,
        header::{X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    routing::{get, post},
};
use contact_relay_app::Application;
use log::info;
use tower_http::{compression::CompressionLayer, set_header::SetResponseHeaderLayer};

use crate::error::ServiceError;

pub mod config;
mod contact;
pub mod cors;
mod diagnostics;
mod error;
pub mod function;
mod health;

pub use config::{HttpConfig, HttpConfigError};
pub use contact::{RelayResult, relay_response};
pub use cors::CorsPolicy;
pub use function::{FunctionHandler, FunctionRequest, FunctionResponse};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MiB

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

pub fn router(app: Arc<Application>, config: &HttpConfig) -> Router {
    let cors = CorsPolicy::new(config.allowed_origins.clone());

    let mut api = Router::new()
        .route("/health", get(health::get_health))
        .route(
            "/contact",
            post(contact::post_contact)
                .options(contact::preflight)
                .fallback(contact::method_not_allowed),
        );
    if config.diagnostics {
        info!("Diagnostics endpoints enabled");
        api = api
            .route("/test-email", get(diagnostics::test_email))
            .route("/test-contact-email", get(diagnostics::test_contact_email));
    }

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(AppState { app })
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors.layer())
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

async fn not_found() -> ServiceError {
    ServiceError::NotFound
}

pub async fn run(
    app: Arc<Application>,
    config: HttpConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = router(app, &config);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;

    info!(
        "HTTP server listening on {}:{} (allowed origins: {})",
        config.host,
        config.port,
        config.allowed_origins.join(", ")
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP server shut down gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode},
    };
    use contact_relay_app::{
        build_application,
        ports::mail::{
            MailError, MailSettingsPresence, MailSetup, MailTimeouts, MockBehaviour,
            MockMailTransportProvider,
        },
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    const ORIGIN: &str = "https://portfolio.example.com";

    const VALID_BODY: &str =
        r#"{"name":"Jane Doe","email":"jane@example.com","subject":"Hi","message":"Hello\nWorld"}"#;

    fn config(diagnostics: bool) -> HttpConfig {
        HttpConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: vec![ORIGIN.to_string()],
            diagnostics,
        }
    }

    fn unconfigured() -> MailSetup {
        MailSetup::Unconfigured(MailSettingsPresence::default())
    }

    fn test_router(mail: MailSetup, diagnostics: bool) -> Router {
        router(
            Arc::new(build_application(mail, MailTimeouts::default())),
            &config(diagnostics),
        )
    }

    fn post_contact(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header("content-type", "application/json")
            .header("origin", ORIGIN)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("origin", ORIGIN)
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router(unconfigured(), false)
            .oneshot(get("/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["message"], "Portfolio API is running");
        assert_eq!(body["method"], "GET");
        assert_eq!(body["path"], "/api/health");
        assert_eq!(body["origin"], ORIGIN);
    }

    #[tokio::test]
    async fn test_contact_without_mail_is_accepted_and_logged() {
        let response = test_router(unconfigured(), false)
            .oneshot(post_contact(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            ORIGIN
        );
        let body = json(response).await;
        assert_eq!(body["success"], true);
        assert!(body.get("messageId").is_none());
    }

    #[tokio::test]
    async fn test_contact_delivers_through_transport() {
        let provider = MockMailTransportProvider::new();
        let response = test_router(MailSetup::Configured(Arc::new(provider.clone())), false)
            .oneshot(post_contact(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["messageId"], "<mock-1@example.com>");

        let sent = provider.send_attempts();
        assert!(sent[0].html.contains(r#"<a href="mailto:jane@example.com">"#));
        assert!(sent[0].html.contains("Hello<br>World"));
    }

    #[tokio::test]
    async fn test_contact_validation_errors_are_400() {
        for body in [
            r#"{"email":"jane@example.com","subject":"Hi","message":"Hello"}"#,
            r#"{"name":"Jane","email":"bob@@x","subject":"Hi","message":"Hello"}"#,
            r#"{"name":"Jane","email":"bob","subject":"Hi","message":"Hello"}"#,
        ] {
            let response = test_router(unconfigured(), false)
                .oneshot(post_contact(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["errorCode"], "ValidationError");
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let response = test_router(unconfigured(), false)
            .oneshot(post_contact("{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["message"], "Invalid JSON format");
        assert_eq!(body["errorCode"], "InvalidPayload");
    }

    #[tokio::test]
    async fn test_oversized_body_keeps_json_envelope() {
        let oversized = format!(
            r#"{{"name":"Jane","email":"jane@example.com","subject":"Hi","message":"{}"}}"#,
            "x".repeat(BODY_LIMIT + 1024 * 1024)
        );
        let response = test_router(unconfigured(), false)
            .oneshot(post_contact(&oversized))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body = json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Request body is too large");
        assert_eq!(body["errorCode"], "InvalidPayload");
    }

    #[tokio::test]
    async fn test_array_body_is_invalid_payload() {
        let response = test_router(unconfigured(), false)
            .oneshot(post_contact(r#"["a","bob@x.com","s","m"]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["errorCode"], "InvalidPayload");
    }

    #[tokio::test]
    async fn test_email_with_surrounding_space_is_400() {
        let response = test_router(unconfigured(), false)
            .oneshot(post_contact(
                r#"{"name":"Bob","email":" bob@x.com","subject":"Hi","message":"Yo"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["errorCode"], "ValidationError");
        assert_eq!(body["message"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_auth_failure_is_500() {
        let provider = MockMailTransportProvider::new().with_sends(vec![MockBehaviour::Fail(
            MailError::Auth("535 5.7.8 rejected".to_string()),
        )]);
        let response = test_router(MailSetup::Configured(Arc::new(provider)), false)
            .oneshot(post_contact(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["errorCode"], "AuthError");
    }

    #[tokio::test]
    async fn test_other_methods_on_contact_are_405() {
        let response = test_router(unconfigured(), false)
            .oneshot(get("/api/contact"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            json(response).await,
            serde_json::json!({ "success": false, "message": "Method Not Allowed" })
        );
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/contact")
            .header("origin", ORIGIN)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let response = test_router(unconfigured(), false)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), ORIGIN);
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("POST") && methods.contains("OPTIONS"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_origin_gets_no_cors_header() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header("origin", "https://elsewhere.example.com")
            .body(Body::from(VALID_BODY))
            .unwrap();
        let response = test_router(unconfigured(), false)
            .oneshot(request)
            .await
            .unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_with_hardening_headers() {
        let response = test_router(unconfigured(), false)
            .oneshot(get("/api/projects"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            json(response).await,
            serde_json::json!({ "success": false, "message": "API endpoint not found" })
        );
    }

    #[tokio::test]
    async fn test_diagnostics_are_opt_in() {
        let response = test_router(unconfigured(), false)
            .oneshot(get("/api/test-email"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test_router(unconfigured(), true)
            .oneshot(get("/api/test-email"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "SMTP not configured");
        assert_eq!(body["config"]["pass"], false);
    }

    #[tokio::test]
    async fn test_diagnostics_send_test_contact() {
        let provider = MockMailTransportProvider::new();
        let response = test_router(MailSetup::Configured(Arc::new(provider.clone())), true)
            .oneshot(get("/api/test-contact-email"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["config"]["host"], "smtp.example.com");
        assert_eq!(provider.send_attempts().len(), 1);
    }
}
