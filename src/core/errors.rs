use spin_sdk::http::Response;
use std::fmt;

/// Failure taxonomy surfaced to callers. Every variant maps to one HTTP
/// status and a `{"message": ...}` JSON body; nothing is retried.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Forbidden => "Forbidden",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        if let ApiError::Internal(msg) = &err {
            log::error!("internal error: {}", msg);
        }
        let body = serde_json::json!({ "message": err.message() });
        Response::builder()
            .status(err.status())
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&body).unwrap_or_default())
            .build()
    }
}
