//! Result Store: thread-safe task-id → latest `ValidationResult` map.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::core::errors::{Result, ValidationError};
use crate::core::task::{TaskStatus, ValidationResult};

/// Thread-safe, bounded result store. Readers take a shared lock; writers an
/// exclusive one. Snapshots are cloned on both write and read so callers
/// never observe (or mutate) the store's internal state directly.
pub struct ResultStore {
    inner: RwLock<HashMap<String, ValidationResult>>,
    capacity: usize,
}

impl ResultStore {
    /// A store bounded to at most `capacity` distinct task ids.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Insert or overwrite a snapshot. Rejects a *new* id once the store is
    /// at capacity; in-place updates of an existing id always succeed.
    pub fn put(&self, snapshot: ValidationResult) -> Result<()> {
        let mut guard = self.inner.write();
        if !guard.contains_key(&snapshot.task_id) && guard.len() >= self.capacity {
            return Err(ValidationError::fatal(format!(
                "result store at capacity ({})",
                self.capacity
            )));
        }
        guard.insert(snapshot.task_id.clone(), snapshot);
        Ok(())
    }

    /// Fetch a snapshot by task id.
    pub fn get(&self, task_id: &str) -> Result<ValidationResult> {
        self.inner
            .read()
            .get(task_id)
            .cloned()
            .ok_or_else(|| ValidationError::NotFound {
                id: task_id.to_string(),
            })
    }

    /// List snapshots, optionally filtered by status and capped at `limit`.
    pub fn list(&self, status: Option<TaskStatus>, limit: Option<usize>) -> Vec<ValidationResult> {
        let guard = self.inner.read();
        let mut results: Vec<_> = guard
            .values()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        results
    }

    /// Current number of distinct stored task ids.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(id: &str, status: TaskStatus) -> ValidationResult {
        let mut result = ValidationResult::interim(id, Utc::now());
        result.status = status;
        result
    }

    #[test]
    fn put_and_get_round_trip() {
        let store = ResultStore::new(10);
        store.put(snapshot("t1", TaskStatus::Running)).unwrap();
        let fetched = store.get("t1").unwrap();
        assert_eq!(fetched.task_id, "t1");
    }

    #[test]
    fn missing_id_returns_not_found() {
        let store = ResultStore::new(10);
        assert!(matches!(store.get("missing"), Err(ValidationError::NotFound { .. })));
    }

    #[test]
    fn new_id_rejected_once_at_capacity_but_updates_still_succeed() {
        let store = ResultStore::new(1);
        store.put(snapshot("t1", TaskStatus::Running)).unwrap();
        assert!(store.put(snapshot("t2", TaskStatus::Running)).is_err());
        assert!(store.put(snapshot("t1", TaskStatus::Completed)).is_ok());
        assert_eq!(store.get("t1").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn list_filters_by_status_and_respects_limit() {
        let store = ResultStore::new(10);
        store.put(snapshot("t1", TaskStatus::Completed)).unwrap();
        store.put(snapshot("t2", TaskStatus::Failed)).unwrap();
        store.put(snapshot("t3", TaskStatus::Completed)).unwrap();

        let completed = store.list(Some(TaskStatus::Completed), None);
        assert_eq!(completed.len(), 2);

        let limited = store.list(None, Some(1));
        assert_eq!(limited.len(), 1);
    }
}
