//! HTTP mapping for `EngineError`: status codes plus a JSON body carrying the
//! structured detail. Internal failures are logged and redacted.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::error;

use crate::error::{EngineError, ErrorClass};
use crate::protocol::ErrorOut;

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Input => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(err: &EngineError) -> ErrorOut {
    if err.class() == ErrorClass::Internal {
        return ErrorOut { error: err.kind(), message: "Internal server error".into(), detail: Value::Null };
    }
    ErrorOut { error: err.kind(), message: err.to_string(), detail: err.detail() }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = status_for(self.class());
        if status.is_server_error() {
            error!(target: "exomaths_backend", error = %self, kind = self.kind(), "Request failed");
        }
        (status, Json(body_for(&self))).into_response()
    }
}
