use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use instances::InstanceError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("invalid button index '{0}'")]
    InvalidButtonIndex(String),

    #[error("invalid input body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("failed to encode chart data: {0}")]
    Encoding(#[from] std::io::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Instance(e) => e.kind(),
            AppError::InvalidButtonIndex(_) => "InvalidButton",
            AppError::InvalidBody(_) => "ParseError",
            AppError::Encoding(_) => "Encoding",
        }
    }
}

/// Every failure is a 500 carrying the message and its kind; the kind is also
/// logged so failures stay distinguishable server side.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        tracing::error!(kind, error = %self, "Request failed.");
        let body = Json(json!({ "error": self.to_string(), "kind": kind }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
