//! Override requests.
//!
//! An [`OverrideRequest`] is the unit submitted to the SIS for changes
//! it cannot apply immediately. Identity is the external id the SIS
//! assigns on submission; from the engine's point of view the request is
//! immutable afterwards except for line statuses, which only the status
//! reconciler updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::ids::{CourseId, RequestId, StudentId};
use crate::status::{combine, combine_all, Status};

/// Overall completion marker the SIS reports for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionStatus {
    /// The SIS still considers the request incomplete.
    InProgress,
    /// All line items have been decided and applied.
    Completed,
    /// The request was withdrawn.
    Cancelled,
}

/// An asynchronous approval-gated registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    /// External id assigned by the SIS; `None` before submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Student the request belongs to.
    pub student_id: StudentId,
    /// When the request was submitted; `None` before submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Line items.
    pub changes: Vec<Change>,
    /// Student-level max-credit override value, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
    /// Requestor note for the request as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Overall completion marker reported by the SIS.
    pub completion: CompletionStatus,
}

impl OverrideRequest {
    /// Create an unsubmitted request.
    #[must_use]
    pub fn new(student_id: StudentId, changes: Vec<Change>) -> Self {
        Self {
            request_id: None,
            student_id,
            submitted_at: None,
            changes,
            max_credit: None,
            note: None,
            completion: CompletionStatus::InProgress,
        }
    }

    /// Attach a student-level max-credit override.
    #[must_use]
    pub fn with_max_credit(mut self, max_credit: f32) -> Self {
        self.max_credit = Some(max_credit);
        self
    }

    /// Attach a requestor note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the request has been submitted to the SIS.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.request_id.is_some()
    }

    /// Whether any line item is still awaiting a decision.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.changes
            .iter()
            .any(|c| matches!(c.status, Some(Status::Pending) | Some(Status::Draft)))
    }

    /// Fold the statuses of all changes referencing `course` into one
    /// course-level status.
    #[must_use]
    pub fn course_status(&self, course: &CourseId) -> Option<Status> {
        combine_all(
            self.changes
                .iter()
                .filter(|c| c.course.as_ref() == Some(course))
                .map(|c| c.status),
        )
    }

    /// Fold the statuses of the course-less max-credit lines into the
    /// student-level max-credit status.
    #[must_use]
    pub fn max_credit_status(&self) -> Option<Status> {
        combine_all(
            self.changes
                .iter()
                .filter(|c| c.is_max_credit())
                .map(|c| c.status),
        )
    }

    /// Request-level summary status.
    ///
    /// Folds every line status by precedence, then downgrades Approved
    /// to Pending while the SIS still reports the request in progress: a
    /// request is never reported approved before it is complete.
    #[must_use]
    pub fn summary_status(&self) -> Option<Status> {
        let folded = combine_all(self.changes.iter().map(|c| c.status));
        match folded {
            Some(Status::Approved) if self.completion == CompletionStatus::InProgress => {
                combine(folded, Some(Status::Pending))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeOperation;
    use crate::ids::Crn;

    fn change(course: &str, crn: &str, status: Option<Status>) -> Change {
        let mut c = Change::section(
            CourseId::from(course),
            Crn::from(crn),
            ChangeOperation::Add,
        );
        c.status = status;
        c
    }

    #[test]
    fn test_course_status_folds_by_precedence() {
        let request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![
                change("MATH 101", "1", Some(Status::Approved)),
                change("MATH 101", "2", Some(Status::Rejected)),
                change("PHYS 172", "3", Some(Status::Approved)),
            ],
        );
        assert_eq!(
            request.course_status(&CourseId::from("MATH 101")),
            Some(Status::Rejected)
        );
        assert_eq!(
            request.course_status(&CourseId::from("PHYS 172")),
            Some(Status::Approved)
        );
        assert_eq!(request.course_status(&CourseId::from("CHEM 115")), None);
    }

    #[test]
    fn test_summary_downgrades_approved_while_in_progress() {
        let mut request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![change("MATH 101", "1", Some(Status::Approved))],
        );
        assert_eq!(request.summary_status(), Some(Status::Pending));

        request.completion = CompletionStatus::Completed;
        assert_eq!(request.summary_status(), Some(Status::Approved));
    }

    #[test]
    fn test_summary_does_not_touch_other_statuses() {
        let request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![change("MATH 101", "1", Some(Status::Rejected))],
        );
        assert_eq!(request.summary_status(), Some(Status::Rejected));
    }

    #[test]
    fn test_max_credit_status_matches_courseless_lines_only() {
        let mut max_line = Change::max_credit(19.0);
        max_line.status = Some(Status::Pending);
        let request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![change("MATH 101", "1", Some(Status::Approved)), max_line],
        )
        .with_max_credit(19.0);
        assert_eq!(request.max_credit_status(), Some(Status::Pending));
    }

    #[test]
    fn test_has_pending_changes() {
        let request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![change("MATH 101", "1", Some(Status::Approved))],
        );
        assert!(!request.has_pending_changes());

        let request = OverrideRequest::new(
            StudentId::from("A1"),
            vec![change("MATH 101", "1", Some(Status::Pending))],
        );
        assert!(request.has_pending_changes());
    }
}
