//! Override request submission and lifecycle.
//!
//! Requests that need human approval (max credit, grade mode, variable
//! credit, variable title) go through the SIS special-registration
//! workflow rather than the real-time path. The manager submits them,
//! persists the stored request the SIS hands back, and projects one
//! status record per affected course plus one for the student-level
//! max-credit line.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use regsync_core::change::error_codes;
use regsync_core::{
    Change, ChangeError, ChangeOperation, CourseId, Crn, OverrideIntent, OverrideRequest,
    RequestId, Status, StudentId, StudentOverrideRecord,
};
use regsync_sis::wire::UpdateNotesRequest;
use regsync_sis::SisClient;

use crate::changeset::ChangeSet;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::OverrideStore;

/// Submits override requests to the SIS and keeps the local projection
/// of their status in step.
pub struct OverrideRequestManager<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    config: EngineConfig,
}

impl<C: SisClient, S: OverrideStore> OverrideRequestManager<C, S> {
    /// Create a manager.
    #[must_use]
    pub fn new(client: Arc<C>, store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Build an unsubmitted request raising the student's credit limit.
    #[must_use]
    pub fn max_credit_request(&self, student_id: StudentId, max_credit: f32) -> OverrideRequest {
        let mut change = Change::max_credit(max_credit).with_error(ChangeError::new(
            error_codes::MAX_CREDIT,
            format!("requested credit limit of {max_credit}"),
        ));
        if let Some(note) = &self.config.max_credit_note {
            change = change.with_note(note.clone());
        }
        OverrideRequest::new(student_id, vec![change]).with_max_credit(max_credit)
    }

    /// Build an unsubmitted grade-mode change request for one section.
    #[must_use]
    pub fn grade_mode_request(
        &self,
        student_id: StudentId,
        course: CourseId,
        crn: Crn,
        grade_mode: &str,
    ) -> OverrideRequest {
        let change = Change::section(course, crn, ChangeOperation::ChangeGradeMode)
            .with_error(ChangeError::new(
                error_codes::GRADE_MODE,
                format!("grade mode change to {grade_mode}"),
            ))
            .with_note(format!("grade mode: {grade_mode}"));
        OverrideRequest::new(student_id, vec![change])
    }

    /// Build an unsubmitted variable-credit change request for one
    /// section.
    #[must_use]
    pub fn variable_credit_request(
        &self,
        student_id: StudentId,
        course: CourseId,
        crn: Crn,
        credit: f32,
    ) -> OverrideRequest {
        let change = Change::section(course, crn, ChangeOperation::ChangeCredit)
            .with_credit(credit)
            .with_error(ChangeError::new(
                error_codes::VARIABLE_CREDIT,
                format!("credit change to {credit}"),
            ));
        OverrideRequest::new(student_id, vec![change])
    }

    /// Build an unsubmitted variable-title request. Title requests are
    /// course-level; the section is assigned during approval.
    #[must_use]
    pub fn variable_title_request(
        &self,
        student_id: StudentId,
        course: CourseId,
        title: &str,
    ) -> OverrideRequest {
        let change = Change::course_level(course, ChangeOperation::RequestVariableTitle)
            .with_error(ChangeError::new(
                error_codes::VARIABLE_TITLE,
                "variable title requested",
            ))
            .with_note(title.to_string());
        OverrideRequest::new(student_id, vec![change])
    }

    /// Assemble an override request from a diff and submit it.
    ///
    /// This is the approval-path counterpart of the real-time
    /// synchronizer: the change-set's lines carry the validation errors
    /// that made them non-resolvable, and the SIS routes them to the
    /// appropriate approvers.
    #[instrument(skip(self, set), fields(student_id = %student_id))]
    pub async fn submit_change_set(
        &self,
        student_id: StudentId,
        set: ChangeSet,
    ) -> EngineResult<OverrideRequest> {
        if set.is_empty() {
            return Err(EngineError::internal(
                "refusing to submit an empty change-set",
            ));
        }
        let request = set.into_request(student_id);
        self.submit(&request).await
    }

    /// Submit a request, persist the stored form the SIS returns, and
    /// project status records for it.
    ///
    /// The returned request carries the SIS-assigned id and the initial
    /// per-change statuses.
    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    pub async fn submit(&self, request: &OverrideRequest) -> EngineResult<OverrideRequest> {
        let response = self.client.submit_registration(request).await?;
        let stored = response
            .requests
            .into_iter()
            .find(|r| r.student_id == request.student_id)
            .ok_or_else(|| {
                EngineError::internal("submitRegistration returned no request for the student")
            })?;
        if stored.request_id.is_none() {
            return Err(EngineError::internal(
                "submitRegistration returned a request without an id",
            ));
        }

        self.store.save_request(&stored).await?;
        self.project_records(&stored).await?;
        info!(request_id = ?stored.request_id, "override request submitted");
        Ok(stored)
    }

    /// Cancel a pending request. Returns `false` without calling the
    /// SIS when the request has nothing left pending.
    #[instrument(skip(self))]
    pub async fn cancel(&self, student_id: &StudentId, request_id: &RequestId) -> EngineResult<bool> {
        let Some(request) = self.store.request_by_id(request_id).await? else {
            return Err(EngineError::not_found(
                "override request",
                request_id.as_str(),
            ));
        };
        if !request.has_pending_changes() {
            debug!("request has no pending changes, skipping cancel");
            return Ok(false);
        }

        let acknowledged = self
            .client
            .cancel_registration_request(student_id, request_id)
            .await?;
        if !acknowledged {
            return Ok(false);
        }

        // Project the cancellation locally; the next sweep confirms it.
        for mut record in self.store.records_for_student(student_id).await? {
            if &record.request_id == request_id && !record.status.is_terminal() {
                record.status = Status::Cancelled;
                record.timestamp = Utc::now();
                self.store.upsert_record(&record).await?;
            }
        }
        info!("override request cancelled");
        Ok(true)
    }

    /// Replace the requestor note on a stored request.
    #[instrument(skip(self, note))]
    pub async fn update_note(
        &self,
        student_id: &StudentId,
        request_id: &RequestId,
        note: &str,
    ) -> EngineResult<bool> {
        if self.store.request_by_id(request_id).await?.is_none() {
            return Err(EngineError::not_found(
                "override request",
                request_id.as_str(),
            ));
        }
        let acknowledged = self
            .client
            .update_requestor_notes(&UpdateNotesRequest {
                student_id: student_id.clone(),
                request_id: request_id.clone(),
                note: note.to_string(),
            })
            .await?;
        if acknowledged {
            if let Some(mut request) = self.store.request_by_id(request_id).await? {
                request.note = Some(note.to_string());
                self.store.save_request(&request).await?;
            }
        }
        Ok(acknowledged)
    }

    /// One record per course in the request, plus the max-credit record
    /// when the request carries the student-level line.
    async fn project_records(&self, request: &OverrideRequest) -> EngineResult<()> {
        let Some(request_id) = &request.request_id else {
            return Ok(());
        };

        let mut seen_courses: Vec<&CourseId> = Vec::new();
        for change in &request.changes {
            let Some(course) = &change.course else {
                continue;
            };
            if seen_courses.contains(&course) {
                continue;
            }
            seen_courses.push(course);

            let status = request
                .course_status(course)
                .unwrap_or(Status::Pending);
            let mut record = StudentOverrideRecord::for_course(
                request.student_id.clone(),
                request_id.clone(),
                course.clone(),
                intent_for(change),
                status,
            );
            if let Some(crn) = &change.crn {
                record = record.with_crn(crn.clone());
            }
            self.store.upsert_record(&record).await?;
        }

        if let Some(max_credit) = request.max_credit {
            if request.changes.iter().any(Change::is_max_credit) {
                let status = request.max_credit_status().unwrap_or(Status::Pending);
                let record = StudentOverrideRecord::for_max_credit(
                    request.student_id.clone(),
                    request_id.clone(),
                    max_credit,
                    status,
                );
                self.store.upsert_record(&record).await?;
            }
        }
        Ok(())
    }
}

/// Derive the record intent from a change line.
fn intent_for(change: &Change) -> OverrideIntent {
    if change.has_error(error_codes::EXTENDED_ADD) {
        return OverrideIntent::ExtendedAdd;
    }
    if change.has_error(error_codes::EXTENDED_DROP) {
        return OverrideIntent::ExtendedDrop;
    }
    match change.operation {
        ChangeOperation::Add => OverrideIntent::Add,
        ChangeOperation::Drop => OverrideIntent::Drop,
        ChangeOperation::Keep
        | ChangeOperation::ChangeGradeMode
        | ChangeOperation::ChangeCredit
        | ChangeOperation::RequestVariableTitle => OverrideIntent::Change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_for_extended_codes() {
        let change = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Add,
        )
        .with_error(ChangeError::new(error_codes::EXTENDED_ADD, "late add"));
        assert_eq!(intent_for(&change), OverrideIntent::ExtendedAdd);

        let change = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Drop,
        )
        .with_error(ChangeError::new(error_codes::EXTENDED_DROP, "late drop"));
        assert_eq!(intent_for(&change), OverrideIntent::ExtendedDrop);
    }

    #[test]
    fn test_intent_for_operations() {
        let add = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Add,
        );
        assert_eq!(intent_for(&add), OverrideIntent::Add);

        let grade = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::ChangeGradeMode,
        );
        assert_eq!(intent_for(&grade), OverrideIntent::Change);
    }
}
