//! Status reconciliation sweeps.
//!
//! The SIS is the source of truth for approval decisions; this module
//! pulls the current special-registration state and folds it into the
//! local request and record projections. A record the sweep no longer
//! reports belongs to a request that disappeared on the SIS side and is
//! marked cancelled, except for wait-list records, whose lifecycle is
//! reconciled elsewhere.
//!
//! Sweeps are idempotent. Running the same sweep twice writes nothing
//! the second time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use regsync_core::{CompletionStatus, OverrideRequest, Status, StudentId};
use regsync_sis::SisClient;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::OverrideStore;

/// Outcome of one batch sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Students the sweep covered.
    pub students: usize,
    /// Students whose local state changed.
    pub changed: usize,
    /// Students whose reconciliation failed.
    pub failed: usize,
}

/// Reconciles local override state against SIS sweep responses.
pub struct StatusReconciler<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    config: EngineConfig,
}

impl<C, S> Clone for StatusReconciler<C, S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<C, S> StatusReconciler<C, S>
where
    C: SisClient + 'static,
    S: OverrideStore + 'static,
{
    /// Create a reconciler.
    #[must_use]
    pub fn new(client: Arc<C>, store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Reconcile one student against a fresh sweep. Returns whether any
    /// local state changed.
    #[instrument(skip(self))]
    pub async fn reconcile_student(&self, student_id: &StudentId) -> EngineResult<bool> {
        let response = self.client.special_registration_status(student_id).await?;
        self.apply_sweep(student_id, &response.requests).await
    }

    /// Reconcile a set of students with batched sweep calls and a
    /// bounded per-student fan-out.
    ///
    /// Per-student failures are logged and counted, never propagated; a
    /// sweep that cannot reach the SIS at all is.
    #[instrument(skip(self, student_ids), fields(students = student_ids.len()))]
    pub async fn reconcile_batch(&self, student_ids: &[StudentId]) -> EngineResult<BatchSummary> {
        let mut by_student: HashMap<StudentId, Vec<OverrideRequest>> = student_ids
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for chunk in student_ids.chunks(self.config.max_batch_size.max(1)) {
            let response = self.client.all_special_registration_status(chunk).await?;
            for row in response.requests {
                let student_id = match &row.student_id {
                    Some(id) => Some(id.clone()),
                    // Some SIS versions omit the student on batch rows;
                    // recover it from the stored request.
                    None => match &row.request_id {
                        Some(request_id) => self
                            .store
                            .request_by_id(request_id)
                            .await?
                            .map(|r| r.student_id),
                        None => None,
                    },
                };
                let Some(student_id) = student_id else {
                    warn!("discarding batch row with no student or request id");
                    continue;
                };
                let request = row.into_request(student_id.clone());
                by_student.entry(student_id).or_default().push(request);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let mut handles = Vec::with_capacity(by_student.len());
        for (student_id, requests) in by_student {
            let reconciler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let error = EngineError::internal("reconciliation semaphore closed");
                        return (student_id, Err(error));
                    }
                };
                let result = reconciler.apply_sweep(&student_id, &requests).await;
                (student_id, result)
            }));
        }

        let mut summary = BatchSummary {
            students: student_ids.len(),
            ..BatchSummary::default()
        };
        for joined in join_all(handles).await {
            match joined {
                Ok((_, Ok(true))) => summary.changed += 1,
                Ok((_, Ok(false))) => {}
                Ok((student_id, Err(error))) => {
                    warn!(student_id = %student_id, error = %error, "student reconciliation failed");
                    summary.failed += 1;
                }
                Err(join_error) => {
                    warn!(error = %join_error, "reconciliation task panicked");
                    summary.failed += 1;
                }
            }
        }
        info!(
            changed = summary.changed,
            failed = summary.failed,
            "batch sweep complete"
        );
        Ok(summary)
    }

    /// Fold one student's sweep result into the local projections.
    async fn apply_sweep(
        &self,
        student_id: &StudentId,
        requests: &[OverrideRequest],
    ) -> EngineResult<bool> {
        let mut changed = false;

        for request in requests {
            let Some(request_id) = &request.request_id else {
                continue;
            };
            let stored = self.store.request_by_id(request_id).await?;
            if stored.as_ref() != Some(request) {
                self.store.save_request(request).await?;
                changed = true;
            }
        }

        // Stored requests the sweep no longer reports disappeared on
        // the SIS side; mark them cancelled, same as their records.
        for mut stored in self.store.requests_for_student(student_id).await? {
            let Some(stored_id) = stored.request_id.clone() else {
                continue;
            };
            if requests
                .iter()
                .any(|r| r.request_id.as_ref() == Some(&stored_id))
            {
                continue;
            }
            if stored.completion != CompletionStatus::Cancelled {
                debug!(request_id = %stored_id, "stored request no longer reported, cancelling");
                stored.completion = CompletionStatus::Cancelled;
                self.store.save_request(&stored).await?;
                changed = true;
            }
        }

        for mut record in self.store.records_for_student(student_id).await? {
            if record.status == Status::Cancelled {
                continue;
            }
            let next = match requests
                .iter()
                .find(|r| r.request_id.as_ref() == Some(&record.request_id))
            {
                None => {
                    if record.exempt_from_orphan_cancellation() {
                        continue;
                    }
                    debug!(request_id = %record.request_id, "request no longer reported, cancelling record");
                    Some(Status::Cancelled)
                }
                Some(request) => {
                    if record.is_max_credit() {
                        request.max_credit_status()
                    } else {
                        record.course.as_ref().and_then(|c| request.course_status(c))
                    }
                }
            };
            if let Some(next) = next {
                if next != record.status {
                    record.status = next;
                    record.timestamp = Utc::now();
                    self.store.upsert_record(&record).await?;
                    changed = true;
                }
            }
        }

        Ok(changed)
    }
}
