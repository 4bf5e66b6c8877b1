use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contact_relay_app::workflow::contact::relay::{RelayError, RelayErrorKind};
use serde::Serialize;

#[derive(Debug)]
pub enum ServiceError {
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    Relay(RelayError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Relay(err) => relay_error_status(err),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (message, error_code) = match self {
            ServiceError::NotFound => ("API endpoint not found".to_string(), None),
            ServiceError::MethodNotAllowed => ("Method Not Allowed".to_string(), None),
            ServiceError::PayloadTooLarge => (
                "Request body is too large".to_string(),
                Some(RelayErrorKind::InvalidPayload.as_str()),
            ),
            ServiceError::Relay(err) => (err.user_message(), Some(err.kind().as_str())),
        };
        ErrorBody {
            success: false,
            message,
            error_code,
        }
    }
}

/// Caller mistakes are 400, everything else is on our side.
pub fn relay_error_status(err: &RelayError) -> StatusCode {
    match err.kind() {
        RelayErrorKind::InvalidPayload | RelayErrorKind::ValidationError => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<RelayError> for ServiceError {
    fn from(value: RelayError) -> Self {
        ServiceError::Relay(value)
    }
}
