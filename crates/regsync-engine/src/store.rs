//! Persistence seam for override requests and records.
//!
//! Relational persistence lives outside this engine; the engine only
//! needs read/write by external request id and by student id. The
//! in-memory implementation backs tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use regsync_core::{OverrideRequest, RequestId, StudentId, StudentOverrideRecord};

use crate::error::EngineResult;

/// Storage seam for reconciled override state.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Look up a request by its external id.
    async fn request_by_id(&self, request_id: &RequestId) -> EngineResult<Option<OverrideRequest>>;

    /// All requests known for a student.
    async fn requests_for_student(
        &self,
        student_id: &StudentId,
    ) -> EngineResult<Vec<OverrideRequest>>;

    /// Insert or replace a request, keyed by its external id.
    ///
    /// Requests without an external id are not persistable; callers
    /// submit first.
    async fn save_request(&self, request: &OverrideRequest) -> EngineResult<()>;

    /// All override records for a student.
    async fn records_for_student(
        &self,
        student_id: &StudentId,
    ) -> EngineResult<Vec<StudentOverrideRecord>>;

    /// Insert or replace a record. Identity is (student, request id,
    /// course-or-max-credit scope).
    async fn upsert_record(&self, record: &StudentOverrideRecord) -> EngineResult<()>;
}

/// In-memory [`OverrideStore`].
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    requests: RwLock<HashMap<RequestId, OverrideRequest>>,
    records: RwLock<Vec<StudentOverrideRecord>>,
}

impl MemoryOverrideStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_scope(a: &StudentOverrideRecord, b: &StudentOverrideRecord) -> bool {
    a.student_id == b.student_id
        && a.request_id == b.request_id
        && a.course == b.course
        && a.is_max_credit() == b.is_max_credit()
}

#[async_trait]
impl OverrideStore for MemoryOverrideStore {
    async fn request_by_id(&self, request_id: &RequestId) -> EngineResult<Option<OverrideRequest>> {
        Ok(self.requests.read().await.get(request_id).cloned())
    }

    async fn requests_for_student(
        &self,
        student_id: &StudentId,
    ) -> EngineResult<Vec<OverrideRequest>> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .filter(|r| &r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn save_request(&self, request: &OverrideRequest) -> EngineResult<()> {
        if let Some(id) = &request.request_id {
            self.requests
                .write()
                .await
                .insert(id.clone(), request.clone());
        }
        Ok(())
    }

    async fn records_for_student(
        &self,
        student_id: &StudentId,
    ) -> EngineResult<Vec<StudentOverrideRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| &r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn upsert_record(&self, record: &StudentOverrideRecord) -> EngineResult<()> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| same_scope(r, record)) {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsync_core::{CourseId, OverrideIntent, Status};

    fn record(student: &str, request: &str, course: Option<&str>) -> StudentOverrideRecord {
        match course {
            Some(course) => StudentOverrideRecord::for_course(
                StudentId::from(student),
                RequestId::from(request),
                CourseId::from(course),
                OverrideIntent::Add,
                Status::Pending,
            ),
            None => StudentOverrideRecord::for_max_credit(
                StudentId::from(student),
                RequestId::from(request),
                19.0,
                Status::Pending,
            ),
        }
    }

    #[tokio::test]
    async fn test_request_roundtrip() {
        let store = MemoryOverrideStore::new();
        let mut request = OverrideRequest::new(StudentId::from("A1"), vec![]);
        request.request_id = Some(RequestId::from("req-1"));
        store.save_request(&request).await.unwrap();

        let loaded = store
            .request_by_id(&RequestId::from("req-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.student_id, StudentId::from("A1"));
        assert_eq!(
            store
                .requests_for_student(&StudentId::from("A1"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_unsubmitted_request_is_not_persisted() {
        let store = MemoryOverrideStore::new();
        let request = OverrideRequest::new(StudentId::from("A1"), vec![]);
        store.save_request(&request).await.unwrap();
        assert!(store
            .requests_for_student(&StudentId::from("A1"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_scope() {
        let store = MemoryOverrideStore::new();
        store
            .upsert_record(&record("A1", "req-1", Some("MATH 101")))
            .await
            .unwrap();

        let mut updated = record("A1", "req-1", Some("MATH 101"));
        updated.status = Status::Approved;
        store.upsert_record(&updated).await.unwrap();

        let records = store
            .records_for_student(&StudentId::from("A1"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Approved);
    }

    #[tokio::test]
    async fn test_max_credit_record_is_distinct_scope() {
        let store = MemoryOverrideStore::new();
        store
            .upsert_record(&record("A1", "req-1", Some("MATH 101")))
            .await
            .unwrap();
        store
            .upsert_record(&record("A1", "req-1", None))
            .await
            .unwrap();
        assert_eq!(
            store
                .records_for_student(&StudentId::from("A1"))
                .await
                .unwrap()
                .len(),
            2
        );
    }
}
