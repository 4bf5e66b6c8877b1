use axum::{
    Json,
    extract::OriginalUri,
    http::{HeaderMap, Method, header::ORIGIN},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl HealthResponse {
    pub fn new(method: &str, path: &str, origin: Option<&str>) -> Self {
        Self {
            status: "OK",
            message: "Portfolio API is running",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            method: method.to_string(),
            path: path.to_string(),
            origin: origin.map(str::to_string),
        }
    }
}

pub async fn get_health(
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Json<HealthResponse> {
    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    Json(HealthResponse::new(method.as_str(), uri.path(), origin))
}
