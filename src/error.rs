use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::EventId;

/* -------------------------
   Calendar core errors
--------------------------*/

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("appointment {0} not found")]
    EventNotFound(EventId),

    #[error("appointment {0} already exists")]
    DuplicateId(EventId),

    #[error("end ({end}) must be after start ({start})")]
    InvalidSpan {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("date out of supported range")]
    OutOfRange,

    #[error("invalid slot layout: {0}")]
    InvalidSlotSpec(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("editor is not open")]
    NotOpen,

    #[error("editor is already open")]
    AlreadyOpen,

    #[error("only an existing appointment can be deleted")]
    NotEditing,

    #[error("hour must be between 1 and 12, got {0}")]
    InvalidHour(u32),

    #[error("minute must be a multiple of 5 between 0 and 55, got {0}")]
    InvalidMinute(u32),

    #[error("no patient record matches \"{0}\"")]
    UnknownPatient(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/* -------------------------
   Store errors
--------------------------*/

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
}

/* -------------------------
   HTTP error envelope
--------------------------*/

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", message.into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound("NOT_FOUND", e.to_string()),
            StoreError::Validation(msg) => ApiError::validation(msg),
            other => ApiError::Internal(format!("store error: {other}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::to_error_response("INTERNAL", &msg),
                )
                    .into_response()
            }
        }
    }
}
