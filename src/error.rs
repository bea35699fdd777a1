use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("Please fill in {0}.")]
    MissingField(&'static str),
    #[error("Nothing to export yet. Add a trip first.")]
    NothingToExport,
    #[error("not found")]
    NotFound,
}

impl AppError {
    /// Errors the user caused and can fix by retrying with different input.
    pub fn is_notice(&self) -> bool {
        matches!(self, AppError::MissingField(_) | AppError::NothingToExport)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MissingField(_) | AppError::NothingToExport => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Io(_) | AppError::Json(_) | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
