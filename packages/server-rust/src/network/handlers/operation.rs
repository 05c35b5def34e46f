//! `POST /sum` and `POST /concat`: JSON in, JSON out.
//!
//! The body is decoded into operands before any endpoint runs, so a body
//! that is not a JSON object of integers and strings never reaches the
//! business core.

use addsvc_core::messages::{ErrorKind, ResultBody};
use addsvc_core::{params_from_json, OperationName, OperationRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use super::AppState;
use crate::service::{CallContext, EndpointError, Transport};

pub async fn sum_handler(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<ResultBody>) {
    handle(&state, OperationName::Sum, &body).await
}

pub async fn concat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ResultBody>) {
    handle(&state, OperationName::Concat, &body).await
}

async fn handle(
    state: &AppState,
    operation: OperationName,
    body: &[u8],
) -> (StatusCode, Json<ResultBody>) {
    let request = match decode_request(operation, body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    let ctx = CallContext::next(Transport::Http, state.config.request_timeout);
    match state.endpoints.invoke(ctx, request).await {
        Ok(res) => (StatusCode::OK, Json(ResultBody::ok(res))),
        Err(e) => error_response(&e),
    }
}

/// Decodes a JSON request body into an operation request.
///
/// # Errors
///
/// Returns `EndpointError::Decode` for invalid JSON and
/// `EndpointError::Payload` for JSON that is not an object of operands.
pub fn decode_request(operation: OperationName, body: &[u8]) -> Result<OperationRequest, EndpointError> {
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| EndpointError::Decode(e.to_string()))?;
    let params = params_from_json(&json)?;
    Ok(OperationRequest::new(operation, params))
}

/// HTTP status for each error classification.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownOperation => StatusCode::NOT_FOUND,
        ErrorKind::BusinessLogic => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Publish => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: &EndpointError) -> (StatusCode, Json<ResultBody>) {
    let kind = err.kind();
    debug!(error = %err, ?kind, "http request failed");
    (status_for(kind), Json(ResultBody::err(kind, err.to_string())))
}
