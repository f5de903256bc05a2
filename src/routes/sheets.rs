use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Router,
    Json,
    http::Method,
};
use serde::Deserialize;
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::{RowPage, SheetAnalysisResponse, UploadResponse, WorkbookAnalysisResponse},
    routes::auth::CurrentUser,
    services::file_processor,
};
use tower_http::cors::{CorsLayer, Any};

const FILE_FIELD: &str = "file";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets/upload", post(upload_sheet))
        .route("/sheets", get(analyze_workbook))
        .route("/sheets/:sheet/analysis", get(analyze_sheet))
        .route("/sheets/:sheet/rows", get(sheet_rows))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
}

async fn upload_sheet(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    tracing::info!("Upload started for user: {}", user.id);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Read(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("Uploaded file has no name".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let file_data = field
            .bytes()
            .await
            .map_err(|e| AppError::Read(e.to_string()))?;

        let response =
            file_processor::process_upload(&state, &user.id, &file_name, content_type, file_data)
                .await?;
        return Ok(Json(response));
    }

    Err(AppError::InvalidInput("Please select a file to upload".to_string()))
}

async fn analyze_workbook(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<WorkbookAnalysisResponse>, AppError> {
    let workbook = file_processor::active_workbook(&state, &user.id)?;
    let first_sheet = workbook.first_sheet().map(str::to_string);

    let start = std::time::Instant::now();
    let sheets = tokio::task::spawn_blocking(move || file_processor::analyze_workbook(&workbook))
        .await
        .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))?;
    tracing::info!("Analyzed {} sheets in {:?}", sheets.len(), start.elapsed());

    Ok(Json(WorkbookAnalysisResponse {
        success: true,
        first_sheet,
        sheets,
    }))
}

async fn analyze_sheet(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(sheet): Path<String>,
) -> Result<Json<SheetAnalysisResponse>, AppError> {
    let workbook = file_processor::active_workbook(&state, &user.id)?;
    let analysis = {
        let sheet = sheet.clone();
        tokio::task::spawn_blocking(move || file_processor::analyze_sheet(&workbook, &sheet))
            .await
            .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))??
    };
    tracing::info!(
        "Sheet {} analyzed: {} rows, recommendations {:?}",
        sheet,
        analysis.row_count,
        analysis.recommendations
    );

    Ok(Json(SheetAnalysisResponse {
        success: true,
        analysis,
    }))
}

async fn sheet_rows(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(sheet): Path<String>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<RowPage>, AppError> {
    let workbook = file_processor::active_workbook(&state, &user.id)?;
    let page = file_processor::preview_rows(&workbook, &sheet, query.offset, query.limit)?;
    Ok(Json(page))
}
