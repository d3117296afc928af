//! Reconciled student override records.
//!
//! A [`StudentOverrideRecord`] is the durable projection the rest of the
//! system reads: one approval status attached either to a single course
//! request or to the student's aggregate max-credit override. Records
//! are created when a request is first observed and mutated only by the
//! status reconciler or by a newer submission that supersedes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, Crn, RequestId, StudentId};
use crate::status::Status;

/// What the recorded request intends to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideIntent {
    /// Add a section.
    Add,
    /// Drop a section.
    Drop,
    /// Change an enrolled course (grade mode, credit, title).
    Change,
    /// Add during the extended registration period.
    ExtendedAdd,
    /// Drop during the extended registration period.
    ExtendedDrop,
    /// Wait-list override.
    Waitlist,
    /// Student-level credit-limit increase.
    MaxCredit,
}

/// One reconciled status line for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverrideRecord {
    /// Student the record belongs to.
    pub student_id: StudentId,
    /// External id of the request this record was observed from.
    pub request_id: RequestId,
    /// Reconciled status.
    pub status: Status,
    /// When the status was last observed.
    pub timestamp: DateTime<Utc>,
    /// Intent of the underlying request.
    pub intent: OverrideIntent,
    /// Course this record is scoped to; `None` for the max-credit record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseId>,
    /// Section, when the intent targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crn: Option<Crn>,
    /// Requested max-credit value, on the max-credit record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
}

impl StudentOverrideRecord {
    /// Create a course-scoped record.
    #[must_use]
    pub fn for_course(
        student_id: StudentId,
        request_id: RequestId,
        course: CourseId,
        intent: OverrideIntent,
        status: Status,
    ) -> Self {
        Self {
            student_id,
            request_id,
            status,
            timestamp: Utc::now(),
            intent,
            course: Some(course),
            crn: None,
            max_credit: None,
        }
    }

    /// Create the student-level max-credit record.
    #[must_use]
    pub fn for_max_credit(
        student_id: StudentId,
        request_id: RequestId,
        max_credit: f32,
        status: Status,
    ) -> Self {
        Self {
            student_id,
            request_id,
            status,
            timestamp: Utc::now(),
            intent: OverrideIntent::MaxCredit,
            course: None,
            crn: None,
            max_credit: Some(max_credit),
        }
    }

    /// Attach the section the intent targets.
    #[must_use]
    pub fn with_crn(mut self, crn: Crn) -> Self {
        self.crn = Some(crn);
        self
    }

    /// Whether this is the student-level max-credit record.
    #[must_use]
    pub fn is_max_credit(&self) -> bool {
        self.intent == OverrideIntent::MaxCredit
    }

    /// Records with wait-list intent are not cancelled when a sweep no
    /// longer reports them; the wait-list lifecycle is reconciled
    /// separately.
    #[must_use]
    pub fn exempt_from_orphan_cancellation(&self) -> bool {
        self.intent == OverrideIntent::Waitlist
    }
}
