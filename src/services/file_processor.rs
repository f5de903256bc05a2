use crate::error::AppError;
use crate::models::{RowPage, UploadResponse};
use crate::services::excel::{
    check_extension, column_summaries, decode, detect_types, recommend, summarize, Row,
    SheetAnalysis, Workbook,
};
use crate::services::store::FileUpload;
use crate::AppState;
use bytes::Bytes;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Runs one upload through the gate and the decoder, records it in the
/// user's history and makes it the user's active workbook.
pub async fn process_upload(
    state: &AppState,
    user_id: &str,
    file_name: &str,
    content_type: Option<String>,
    file_data: Bytes,
) -> Result<UploadResponse, AppError> {
    let start = Instant::now();
    check_extension(file_name)?;

    let file_size = file_data.len();
    if file_size > state.config.max_file_size {
        return Err(AppError::FileTooLarge {
            size: file_size,
            limit: state.config.max_file_size,
        });
    }

    tracing::info!("Decoding {} ({}KB) for user {}", file_name, file_size / 1024, user_id);
    let decode_start = Instant::now();
    let workbook = tokio::task::spawn_blocking(move || decode(&file_data))
        .await
        .map_err(|e| AppError::Internal(format!("Decode task failed: {}", e)))??;
    tracing::info!(
        "Decoded {} sheets in {:?}",
        workbook.sheet_names.len(),
        decode_start.elapsed()
    );

    let history_id = match state.store.save_file_history(
        user_id,
        FileUpload {
            name: file_name.to_string(),
            size: file_size as u64,
            content_type,
            sheet_names: workbook.sheet_names.clone(),
        },
    ) {
        Ok(record) => Some(record.id),
        Err(e) => {
            // history is best effort; the upload itself succeeded
            tracing::warn!("Failed to save file history for {}: {}", file_name, e);
            None
        }
    };

    let workbook = state.sessions.replace(user_id, workbook);
    let row_counts = workbook
        .sheets
        .iter()
        .map(|(name, rows)| (name.clone(), rows.len()))
        .collect();

    tracing::info!("Upload of {} processed in {:?}", file_name, start.elapsed());

    Ok(UploadResponse {
        success: true,
        file_name: file_name.to_string(),
        file_size,
        sheet_names: workbook.sheet_names.clone(),
        first_sheet: workbook.first_sheet().map(str::to_string),
        headers: workbook.headers.clone(),
        row_counts,
        history_id,
    })
}

pub fn active_workbook(state: &AppState, user_id: &str) -> Result<Arc<Workbook>, AppError> {
    state
        .sessions
        .active(user_id)
        .ok_or_else(|| AppError::NotFound("No workbook has been uploaded in this session".to_string()))
}

fn sheet_rows<'a>(workbook: &'a Workbook, sheet: &str) -> Result<&'a [Row], AppError> {
    workbook
        .rows(sheet)
        .map(Vec::as_slice)
        .ok_or_else(|| AppError::NotFound(format!("Sheet {} does not exist", sheet)))
}

/// Profiles one sheet: stats, types, per-column summaries and chart kinds.
pub fn analyze_sheet(workbook: &Workbook, sheet: &str) -> Result<SheetAnalysis, AppError> {
    let rows = sheet_rows(workbook, sheet)?;
    Ok(analyze_rows(sheet, rows, workbook.headers(sheet)))
}

pub fn analyze_rows(sheet: &str, rows: &[Row], headers: &[String]) -> SheetAnalysis {
    let start = Instant::now();
    let stats = summarize(rows);
    let column_types = detect_types(rows);
    let recommendations = recommend(&column_types);
    let columns = column_summaries(rows, headers, &stats, &column_types);

    tracing::debug!(
        "Profiled sheet {} ({} rows, {} columns) in {:?}",
        sheet,
        rows.len(),
        headers.len(),
        start.elapsed()
    );

    SheetAnalysis {
        sheet: sheet.to_string(),
        row_count: rows.len(),
        headers: headers.to_vec(),
        stats,
        column_types,
        columns,
        recommendations,
    }
}

/// Profiles every sheet in parallel, returned in workbook order.
pub fn analyze_workbook(workbook: &Workbook) -> Vec<SheetAnalysis> {
    workbook
        .sheet_names
        .par_iter()
        .map(|name| {
            let rows = workbook.rows(name).map(Vec::as_slice).unwrap_or(&[]);
            analyze_rows(name, rows, workbook.headers(name))
        })
        .collect()
}

pub fn preview_rows(
    workbook: &Workbook,
    sheet: &str,
    offset: usize,
    limit: Option<usize>,
) -> Result<RowPage, AppError> {
    let rows = sheet_rows(workbook, sheet)?;
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    Ok(RowPage {
        success: true,
        sheet: sheet.to_string(),
        offset,
        total: rows.len(),
        rows: rows.iter().skip(offset).take(limit).cloned().collect(),
    })
}
