//! CSV upload: type and size checks, a temporary write, a bounded
//! processing step that counts rows, then cleanup.

use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use data_pipeline::ingest::count_rows_in_file;
use data_pipeline::IngestError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const FIELD_NAME: &str = "csvFile";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub rows: usize,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Upload(IngestError::TooLarge)
    } else {
        AppError::BadRequest(format!("Error de carga: {}", e.body_text()))
    }
}

/// Keep only the final path component, with a conservative character set.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Count rows after the configured delay, bounded by the processing cap.
/// The file is removed afterwards whatever the outcome.
pub async fn process_upload(path: PathBuf, cfg: &UploadConfig) -> Result<usize, IngestError> {
    let delay = Duration::from_millis(cfg.processing_delay_ms);
    let cap = Duration::from_millis(cfg.processing_timeout_ms);
    let target = path.clone();
    let work = async move {
        tokio::time::sleep(delay).await;
        tokio::task::spawn_blocking(move || count_rows_in_file(&target))
            .await
            .map_err(|e| IngestError::Processing(e.to_string()))?
    };
    let outcome = match tokio::time::timeout(cap, work).await {
        Ok(result) => result,
        Err(_) => Err(IngestError::Processing(format!(
            "processing exceeded {} ms",
            cfg.processing_timeout_ms
        ))),
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "failed to remove upload");
    }
    outcome
}

pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let cfg = &state.config.upload;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FIELD_NAME) {
            continue;
        }
        state.upload_policy.check_content_type(field.content_type())?;
        let original = sanitize_file_name(field.file_name().unwrap_or("upload.csv"));
        let data = field.bytes().await.map_err(multipart_error)?;
        state.upload_policy.check_size(data.len())?;

        tokio::fs::create_dir_all(&cfg.dir)
            .await
            .map_err(IngestError::from)?;
        let stamp = chrono::Utc::now().timestamp_millis();
        let path = cfg.dir.join(format!("{stamp}-{original}"));
        tokio::fs::write(&path, &data)
            .await
            .map_err(IngestError::from)?;
        info!(file = %original, bytes = data.len(), "upload stored, processing");

        let rows = process_upload(path, cfg).await?;
        info!(file = %original, rows, "upload processed");
        return Ok(Json(UploadResponse { status: "ok", rows }));
    }
    Err(IngestError::MissingFile.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dir: PathBuf, delay: u64, cap: u64) -> UploadConfig {
        UploadConfig {
            dir,
            max_bytes: 1024,
            processing_delay_ms: delay,
            processing_timeout_ms: cap,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("forecast-upload-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_names_are_flattened() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("ventas 2023.csv"), "ventas_2023.csv");
    }

    #[tokio::test]
    async fn processing_counts_and_cleans_up() {
        let dir = scratch("ok");
        let path = dir.join("a.csv");
        std::fs::write(&path, "sku,units\nA,1\nB,2\n").unwrap();
        let rows = process_upload(path.clone(), &cfg(dir.clone(), 0, 1000))
            .await
            .unwrap();
        assert_eq!(rows, 2);
        assert!(!path.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn processing_timeout_is_a_failure() {
        let dir = scratch("slow");
        let path = dir.join("b.csv");
        std::fs::write(&path, "sku\nA\n").unwrap();
        let err = process_upload(path.clone(), &cfg(dir.clone(), 200, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Processing(_)));
        assert!(!path.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
