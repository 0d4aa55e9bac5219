//! Unified error type for handlers, mapped onto status codes and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_pipeline::{IngestError, ReportError};
use forecast_core::ValidationError;
use forecast_econ::EconError;
use scenario_editor::EditorError;
use scenario_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Client input error, 400 `{error}`.
    #[error("{0}")]
    BadRequest(String),
    /// Finalize on a scenario that is not active, 400 `{error}`.
    #[error("{0}")]
    Conflict(String),
    #[error("No autenticado")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    /// Lookup miss, 404 `{message}`.
    #[error("{0}")]
    NotFound(String),
    /// Lookup miss on a write endpoint, 404 `{error}`.
    #[error("{0}")]
    UnknownTarget(String),
    #[error(transparent)]
    Upload(#[from] IngestError),
    /// Logged, answered with a generic JSON body.
    #[error("internal error: {0}")]
    Internal(String),
    /// Logged, answered with a plain-text body.
    #[error("page error: {0}")]
    Page(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound(e.to_string()),
            StoreError::Conflict { .. } => AppError::Conflict(e.to_string()),
            StoreError::InvalidSeed(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<EditorError> for AppError {
    fn from(e: EditorError) -> Self {
        match e {
            EditorError::UnknownScenario(_) => AppError::NotFound(e.to_string()),
            EditorError::NotCustom(_) | EditorError::Validation(_) => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<EconError> for AppError {
    fn from(e: EconError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        AppError::Page(format!("{e:?}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "No autenticado" }),
            ),
            AppError::Forbidden => return (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "message": msg })),
            AppError::UnknownTarget(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Upload(e) => match e {
                IngestError::NotCsv | IngestError::TooLarge | IngestError::MissingFile => {
                    (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
                }
                IngestError::UnknownItem(_) => {
                    (StatusCode::NOT_FOUND, json!({ "message": "Ítem no encontrado." }))
                }
                IngestError::Processing(ref detail) => {
                    error!(error = %detail, "csv processing failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Error procesando CSV" }),
                    )
                }
                IngestError::Io(ref io) => {
                    error!(error = %io, "upload io failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Error procesando CSV" }),
                    )
                }
            },
            AppError::Internal(detail) => {
                error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Error interno del servidor" }),
                )
            }
            AppError::Page(detail) => {
                error!(error = %detail, "page rendering failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor al cargar la página.",
                )
                    .into_response();
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
