//! Adapter for function-as-a-service platforms that hand over the request as
//! a JSON event and expect a JSON response object back.

use std::{collections::BTreeMap, sync::Arc};

use axum::http::{Method, StatusCode, header::CONTENT_TYPE};
use base64::{Engine, engine::general_purpose::STANDARD};
use contact_relay_app::{Application, workflow::contact::relay::RelayError};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    contact::relay_response, cors::CorsPolicy, error::ServiceError, health::HealthResponse,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl FunctionRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub struct FunctionHandler {
    app: Arc<Application>,
    cors: CorsPolicy,
}

impl FunctionHandler {
    pub fn new(app: Arc<Application>, cors: CorsPolicy) -> Self {
        Self { app, cors }
    }

    pub async fn handle(&self, request: FunctionRequest) -> FunctionResponse {
        let method = request.http_method.to_ascii_uppercase();
        let (status, body) = if request.path.trim_end_matches('/').ends_with("health") {
            self.health(&method, &request)
        } else {
            self.contact(&method, &request).await
        };

        let mut headers: BTreeMap<String, String> = self
            .cors
            .headers(request.header("origin"))
            .into_iter()
            .collect();
        if !body.is_empty() {
            headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        }
        FunctionResponse {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    fn health(&self, method: &str, request: &FunctionRequest) -> (StatusCode, String) {
        if method == Method::OPTIONS.as_str() {
            return (StatusCode::OK, String::new());
        }
        let health = HealthResponse::new(method, &request.path, request.header("origin"));
        (StatusCode::OK, to_json(&health))
    }

    async fn contact(&self, method: &str, request: &FunctionRequest) -> (StatusCode, String) {
        if method == Method::OPTIONS.as_str() {
            return (StatusCode::OK, String::new());
        }
        if method != Method::POST.as_str() {
            let err = ServiceError::MethodNotAllowed;
            return (err.status(), to_json(&err.body()));
        }

        let body = match decode_body(request) {
            Ok(body) => body,
            Err(err) => {
                warn!("Could not decode function body: {}", err);
                let (status, result) = relay_response(Err(RelayError::InvalidPayload(err)));
                return (status, to_json(&result));
            }
        };
        let result = self.app.relay_contact_use_case.relay(&body).await;
        let (status, result) = relay_response(result);
        (status, to_json(&result))
    }
}

fn decode_body(request: &FunctionRequest) -> Result<Vec<u8>, String> {
    let body = request.body.as_deref().unwrap_or_default();
    if request.is_base64_encoded {
        STANDARD.decode(body).map_err(|e| e.to_string())
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    // Plain structs of strings and numbers always serialize.
    serde_json::to_string(value).unwrap_or_default()
}
