//! Wire contract with the SIS.
//!
//! Conceptual shapes of the JSON bodies exchanged with the SIS. Domain
//! types from `regsync-core` already serialize in the wire's camelCase
//! convention, so request/override payloads reuse them directly; this
//! module adds the endpoint-specific envelopes around them.
//!
//! Every 200 response carries an optional status envelope. A body whose
//! `status` is present and not `"OK"` is a protocol failure, surfaced as
//! [`crate::SisError::Envelope`] with the raw message.

use serde::{Deserialize, Serialize};

use regsync_core::{
    CampusId, ChangeError, CompletionStatus, Crn, EnrollmentLine, OverrideRequest, StudentId,
    TermId,
};

/// Status/message pair embedded in every response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// `"OK"` on success; anything else is a rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Failure detail when `status` is not `"OK"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseEnvelope {
    /// Whether the envelope reports success. A missing status counts as
    /// success; some endpoints only set it on failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("ok"))
    }

    /// The failure message, or a generic fallback.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "SIS reported failure without a message".to_string())
    }
}

/// `GET checkEligibility` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    /// Whether the student may enroll at all.
    #[serde(default)]
    pub can_enroll: bool,
    /// Whether override workflows are available to this student.
    #[serde(default)]
    pub can_request_overrides: bool,
    /// Whether extended-registration workflows are open.
    #[serde(default)]
    pub extended_registration: bool,
    /// Error codes the student may request overrides for.
    #[serde(default)]
    pub allowed_overrides: Vec<String>,
    /// Credit ceiling currently granted to the student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
}

/// `GET checkSpecialRegistrationStatus` response (single student).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialRegistrationStatusResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    /// Requests the SIS currently knows for the student.
    #[serde(default)]
    pub requests: Vec<OverrideRequest>,
    /// Credit ceiling currently granted to the student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
}

/// One stored request as the batch status endpoint reports it.
///
/// Unlike the single-student endpoint, the batch endpoint does not
/// guarantee to echo `studentId` per record; callers resolve the
/// student by request id when it is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStoredRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<regsync_core::RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub changes: Vec<regsync_core::Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub completion: CompletionStatus,
}

impl BatchStoredRequest {
    /// Convert to the domain request, supplying the student when the
    /// SIS omitted it.
    #[must_use]
    pub fn into_request(self, fallback_student: StudentId) -> OverrideRequest {
        OverrideRequest {
            request_id: self.request_id,
            student_id: self.student_id.unwrap_or(fallback_student),
            submitted_at: self.submitted_at,
            changes: self.changes,
            max_credit: self.max_credit,
            note: self.note,
            completion: self.completion,
        }
    }
}

/// `GET checkAllSpecialRegistrationStatus` response (batch).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    /// Requests across all queried students.
    #[serde(default)]
    pub requests: Vec<BatchStoredRequest>,
}

/// Add/drop CRN lists for a restriction check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionChanges {
    #[serde(default)]
    pub add: Vec<Crn>,
    #[serde(default)]
    pub drop: Vec<Crn>,
}

/// `POST checkRestrictions` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRestrictionsRequest {
    pub student_id: StudentId,
    pub term: TermId,
    pub campus: CampusId,
    /// Validation mode understood by the SIS (e.g. `"REG"`, `"WAITLIST"`).
    pub mode: String,
    pub changes: RestrictionChanges,
}

/// One problem the restriction check reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionProblem {
    /// Section the problem applies to; absent for student-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crn: Option<Crn>,
    pub code: String,
    pub message: String,
}

impl RestrictionProblem {
    /// View the problem as a per-line change error.
    #[must_use]
    pub fn to_change_error(&self) -> ChangeError {
        ChangeError::new(self.code.clone(), self.message.clone())
    }
}

/// `POST checkRestrictions` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRestrictionsResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    /// Per-CRN and student-level problems.
    #[serde(default)]
    pub problems: Vec<RestrictionProblem>,
    /// Max-credit figure the SIS calculated for the proposed changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
    /// CRNs the SIS refuses outright.
    #[serde(default)]
    pub denied: Vec<Crn>,
    /// CRNs whose pending requests would be cancelled by the changes.
    #[serde(default)]
    pub cancel: Vec<Crn>,
}

/// `POST submitRegistration` response: the stored requests, with the
/// SIS-assigned ids and per-line statuses filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub requests: Vec<OverrideRequest>,
}

/// Generic success/failure response (cancel, note update).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub success: bool,
}

/// `POST updateRequestorNotes` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotesRequest {
    pub student_id: StudentId,
    pub request_id: regsync_core::RequestId,
    pub note: String,
}

/// `GET` real-time enrollment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub student_id: StudentId,
    #[serde(default)]
    pub lines: Vec<EnrollmentLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
}

/// Kind of a real-time enrollment action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollmentActionKind {
    Add,
    Drop,
    Keep,
}

/// One line of a real-time enrollment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentAction {
    pub operation: EnrollmentActionKind,
    pub crn: Crn,
    /// Override codes attached to this line by the auto-override loop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,
}

impl EnrollmentAction {
    /// Create an action with no overrides.
    #[must_use]
    pub fn new(operation: EnrollmentActionKind, crn: Crn) -> Self {
        Self {
            operation,
            crn,
            overrides: Vec::new(),
        }
    }
}

/// `POST` real-time enrollment request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentChangeRequest {
    pub student_id: StudentId,
    pub term: TermId,
    pub campus: CampusId,
    pub actions: Vec<EnrollmentAction>,
    /// When set, the SIS treats the add and drop lines as one atomic
    /// unit.
    #[serde(default)]
    pub conditional_add_drop: bool,
}

/// Per-CRN outcome of a real-time enrollment submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResultLine {
    pub crn: Crn,
    /// Whether the line ended up registered.
    #[serde(default)]
    pub registered: bool,
    /// Problems reported for this line.
    #[serde(default)]
    pub errors: Vec<ChangeError>,
}

/// `POST` real-time enrollment response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResultResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub lines: Vec<EnrollmentResultLine>,
    /// Registration-wide exception string, set when the whole submission
    /// failed rather than individual lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}
