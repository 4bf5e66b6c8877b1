use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contact_relay_app::workflow::diagnostics::test_email::TestEmailReport;
use serde::Serialize;

use crate::{AppState, error::relay_error_status};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ConfigReport {
    /// Which settings were found, never their values.
    Presence { host: bool, user: bool, pass: bool },
    Transport {
        host: String,
        port: u16,
        from: String,
        to: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigReport>,
}

pub fn report_response(
    report: TestEmailReport,
    sent_message: &str,
) -> (StatusCode, DiagnosticsResponse) {
    match report {
        TestEmailReport::NotConfigured(presence) => (
            StatusCode::OK,
            DiagnosticsResponse {
                success: false,
                message: "SMTP not configured".to_string(),
                message_id: None,
                error_code: None,
                config: Some(ConfigReport::Presence {
                    host: presence.host,
                    user: presence.user,
                    pass: presence.pass,
                }),
            },
        ),
        TestEmailReport::Sent {
            message_id,
            transport,
            identity,
        } => (
            StatusCode::OK,
            DiagnosticsResponse {
                success: true,
                message: sent_message.to_string(),
                message_id: Some(message_id.to_string()),
                error_code: None,
                config: Some(ConfigReport::Transport {
                    host: transport.host,
                    port: transport.port,
                    from: identity.from_address,
                    to: identity.owner_address,
                }),
            },
        ),
        TestEmailReport::Failed(err) => (
            relay_error_status(&err),
            DiagnosticsResponse {
                success: false,
                message: err.user_message(),
                message_id: None,
                error_code: Some(err.kind().as_str()),
                config: None,
            },
        ),
    }
}

pub async fn test_email(State(state): State<AppState>) -> Response {
    let report = state.app.send_test_email_use_case.send_test_email().await;
    let (status, body) = report_response(report, "Test email sent successfully");
    (status, Json(body)).into_response()
}

pub async fn test_contact_email(State(state): State<AppState>) -> Response {
    let report = state.app.send_test_email_use_case.send_test_contact().await;
    let (status, body) = report_response(report, "Test contact email sent successfully");
    (status, Json(body)).into_response()
}
