use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contact_relay_app::workflow::contact::relay::{RelayError, RelayOutcome};
use log::warn;
use serde::Serialize;

use crate::{AppState, error::ServiceError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// Shapes a relay result the same way for every adapter.
pub fn relay_response(result: Result<RelayOutcome, RelayError>) -> (StatusCode, RelayResult) {
    match result {
        Ok(outcome) => {
            let message_id = match &outcome {
                RelayOutcome::Delivered { message_id, .. } => Some(message_id.to_string()),
                RelayOutcome::Logged { .. } => None,
            };
            (
                StatusCode::OK,
                RelayResult {
                    success: true,
                    message: outcome.user_message().to_string(),
                    message_id,
                    error_code: None,
                },
            )
        }
        Err(err) => {
            let err = ServiceError::from(err);
            let body = err.body();
            (
                err.status(),
                RelayResult {
                    success: false,
                    message: body.message,
                    message_id: None,
                    error_code: body.error_code,
                },
            )
        }
    }
}

pub async fn post_contact(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Rejected contact body: {}", rejection.body_text());
            return ServiceError::PayloadTooLarge.into_response();
        }
        Err(rejection) => {
            warn!("Could not read contact body: {}", rejection.body_text());
            let (status, body) = relay_response(Err(RelayError::InvalidPayload(
                rejection.body_text(),
            )));
            return (status, Json(body)).into_response();
        }
    };
    let result = state.app.relay_contact_use_case.relay(&body).await;
    let (status, body) = relay_response(result);
    (status, Json(body)).into_response()
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ServiceError {
    ServiceError::MethodNotAllowed
}
