use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use contact_http_api::{CorsPolicy, FunctionHandler, FunctionRequest};
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use log::info;
use portfolio_contact::{
    logs::init_logger,
    startup::{compose, env_lookup},
};

fn function_request(event: Request) -> FunctionRequest {
    let headers = event
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect::<BTreeMap<_, _>>();
    let (body, is_base64_encoded) = match event.body() {
        Body::Empty => (None, false),
        Body::Text(text) => (Some(text.clone()), false),
        Body::Binary(bytes) => (Some(STANDARD.encode(bytes)), true),
    };
    FunctionRequest {
        http_method: event.method().to_string(),
        path: event.uri().path().to_string(),
        headers,
        body,
        is_base64_encoded,
    }
}

async fn handle(handler: &FunctionHandler, event: Request) -> Result<Response<Body>, Error> {
    let response = handler.handle(function_request(event)).await;

    let mut builder = Response::builder().status(response.status_code);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    let body = if response.body.is_empty() {
        Body::Empty
    } else {
        Body::Text(response.body)
    };
    Ok(builder.body(body)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _handle = init_logger(None)?;

    let startup = compose(env_lookup)?;
    let handler = FunctionHandler::new(
        startup.app,
        CorsPolicy::new(startup.http.allowed_origins),
    );

    info!("Starting contact function");
    run(service_fn(|event| handle(&handler, event))).await
}
