use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by every handler. Rendered as `{"success": false, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{}을(를) 찾을 수 없습니다.", what))
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "로그인이 필요합니다.")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<academy_core::Error> for ApiError {
    fn from(error: academy_core::Error) -> Self {
        use academy_core::Error;

        match error {
            Error::NotFound(what) => Self::new(StatusCode::NOT_FOUND, what),
            Error::Unauthorized(_) => Self::unauthorized(),
            Error::InvalidInput(message) | Error::InvalidUrl(message) => Self::bad_request(message),
            other => {
                tracing::error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}
