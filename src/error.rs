use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to launch tesseract ({binary}): {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while talking to tesseract: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("tesseract exited with {}: {stderr}", display_code(.code))]
    EngineFailed { code: Option<i32>, stderr: String },

    #[error("Unable to find version pattern in tesseract output")]
    VersionNotFound,

    #[error("tesseract did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::Spawn { .. } => (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_UNAVAILABLE"),
            OcrError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            OcrError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DECODE_ERROR"),
            OcrError::EngineFailed { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "ENGINE_FAILED"),
            OcrError::VersionNotFound => (StatusCode::INTERNAL_SERVER_ERROR, "UNEXPECTED_OUTPUT"),
            OcrError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            OcrError::InvalidOption(_) => (StatusCode::BAD_REQUEST, "INVALID_OPTION"),
            OcrError::Preprocessing(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PREPROCESSING_ERROR")
            }
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
