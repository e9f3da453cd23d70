//! CSV upload endpoint
//!
//! Validates the upload and hands the body to the task queue. Processing
//! happens in the background; this handler never reports pipeline outcomes.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::tasks::Task;
use crate::AppState;

/// Multipart part carrying the feed
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub status: &'static str,
    pub message: &'static str,
}

/// POST /process-csv/
pub async fn process_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadAccepted>)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = upload else {
        error!("No file was uploaded");
        return Err(ApiError::BadRequest("No file was uploaded".to_string()));
    };

    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        error!(file_name = %file_name, "Invalid file format");
        return Err(ApiError::BadRequest("Invalid file format".to_string()));
    }

    let content = String::from_utf8(data.to_vec()).map_err(|_| {
        error!(file_name = %file_name, "Uploaded file is not valid UTF-8");
        ApiError::BadRequest("File is not valid UTF-8".to_string())
    })?;

    let size = content.len();
    state.dispatcher.dispatch(Task::ProcessCsv { content });
    info!(file_name = %file_name, bytes = size, "Asynchronous processing started for file");

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            status: "success",
            message: "The CSV file is being processed",
        }),
    ))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/process-csv/", post(process_csv))
}
