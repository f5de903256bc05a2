use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Profile fields supplied by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// Metadata about an uploaded file, as known to the caller.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub sheet_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileHistoryRecord {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub sheet_names: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// User and upload-history persistence. Injected into the service; the
/// profiling pipeline never touches it.
pub trait Store: Send + Sync {
    fn save_user(&self, profile: UserProfile) -> Result<UserRecord, StoreError>;

    fn all_users(&self) -> Vec<UserRecord>;

    fn save_file_history(
        &self,
        user_id: &str,
        upload: FileUpload,
    ) -> Result<FileHistoryRecord, StoreError>;

    /// Uploads by one user, newest first.
    fn file_history(&self, user_id: &str) -> Result<Vec<FileHistoryRecord>, StoreError>;

    /// Every upload, newest first.
    fn all_file_history(&self) -> Vec<FileHistoryRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<UserRecord>>,
    history: RwLock<Vec<FileHistoryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut records: Vec<FileHistoryRecord>) -> Vec<FileHistoryRecord> {
    records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    records
}

impl Store for InMemoryStore {
    fn save_user(&self, profile: UserProfile) -> Result<UserRecord, StoreError> {
        if profile.subject.trim().is_empty() {
            return Err(StoreError::MissingField("user id"));
        }

        let now = Utc::now();
        let mut users = self.users.write();

        if let Some(existing) = users.iter_mut().find(|u| u.subject == profile.subject) {
            existing.email = profile.email;
            existing.name = profile.name;
            existing.picture = profile.picture;
            existing.last_login = now;
            debug!("Updated user {}", existing.id);
            return Ok(existing.clone());
        }

        let record = UserRecord {
            id: format!("user_{}", Uuid::new_v4()),
            subject: profile.subject,
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
            role: "user".to_string(),
            created_at: now,
            last_login: now,
        };
        info!("Created user {}", record.id);
        users.push(record.clone());
        Ok(record)
    }

    fn all_users(&self) -> Vec<UserRecord> {
        self.users.read().clone()
    }

    fn save_file_history(
        &self,
        user_id: &str,
        upload: FileUpload,
    ) -> Result<FileHistoryRecord, StoreError> {
        if user_id.trim().is_empty() {
            return Err(StoreError::MissingField("user id"));
        }
        if upload.name.trim().is_empty() {
            return Err(StoreError::MissingField("file name"));
        }

        let record = FileHistoryRecord {
            id: format!("history_{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            file_name: upload.name,
            file_size: upload.size,
            file_type: upload
                .content_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            sheet_names: upload.sheet_names,
            uploaded_at: Utc::now(),
        };
        self.history.write().push(record.clone());
        Ok(record)
    }

    fn file_history(&self, user_id: &str) -> Result<Vec<FileHistoryRecord>, StoreError> {
        if user_id.trim().is_empty() {
            return Err(StoreError::MissingField("user id"));
        }
        let records = self
            .history
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    fn all_file_history(&self) -> Vec<FileHistoryRecord> {
        newest_first(self.history.read().clone())
    }
}
