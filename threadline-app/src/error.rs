use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use threadline_llm::DispatchError;

/// Request-level failure, rendered as `{"success": false, "error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("could not extract usable text from the provided links: {0}")]
    Extraction(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("malformed structured response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}
