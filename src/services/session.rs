use crate::services::excel::Workbook;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Holds each user's active workbook until it is replaced or sits idle too long.
#[derive(Clone)]
pub struct SessionStore {
    workbooks: Cache<String, Arc<Workbook>>,
}

impl SessionStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            workbooks: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(ttl)
                .build(),
        }
    }

    /// Makes `workbook` the user's active one, dropping whatever was there.
    pub fn replace(&self, user_id: &str, workbook: Workbook) -> Arc<Workbook> {
        let workbook = Arc::new(workbook);
        self.workbooks.insert(user_id.to_string(), Arc::clone(&workbook));
        workbook
    }

    pub fn active(&self, user_id: &str) -> Option<Arc<Workbook>> {
        self.workbooks.get(user_id)
    }
}
