use crate::services::excel::{Row, SheetAnalysis};
use crate::services::store::{FileHistoryRecord, UserRecord};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_name: String,
    pub file_size: usize,
    pub sheet_names: Vec<String>,
    pub first_sheet: Option<String>,
    pub headers: HashMap<String, Vec<String>>,
    pub row_counts: HashMap<String, usize>,
    pub history_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetAnalysisResponse {
    pub success: bool,
    pub analysis: SheetAnalysis,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookAnalysisResponse {
    pub success: bool,
    pub first_sheet: Option<String>,
    pub sheets: Vec<SheetAnalysis>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
    pub success: bool,
    pub sheet: String,
    pub offset: usize,
    pub total: usize,
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<FileHistoryRecord>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserRecord>,
}
