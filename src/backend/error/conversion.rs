/**
 * Error Conversion
 *
 * `IntoResponse` for `ApiError`, so handlers can return it directly.
 *
 * # Response Format
 *
 * Error responses are JSON:
 * ```json
 * {
 *   "error": "ticket cannot go from resolved to onHold",
 *   "code": "statusNotAllowed",
 *   "status": 409
 * }
 * ```
 *
 * The `code` field is present only for errors that carry a machine-readable
 * reason code. Server-side failures log the full error and return a
 * redacted message.
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::ApiError;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });
        if let Some(code) = self.code() {
            body["code"] = serde_json::Value::String(code.to_string());
        }

        (status, Json(body)).into_response()
    }
}
