//! Registration change line items.
//!
//! A [`Change`] is one add/drop/keep/modify line in a registration or
//! override request. Changes are computed fresh on every diff and never
//! persist standalone; errors attached to a change are data reported by
//! the SIS, not engine failures.

use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, Crn};
use crate::status::Status;

/// Error codes reported per line by the SIS.
///
/// The vocabulary is controlled by the SIS; these constants cover the
/// codes the engine inspects by name.
pub mod error_codes {
    /// Section is full (space conflict).
    pub const CLOSED: &str = "CLOS";
    /// Time conflict with another registered section.
    pub const TIME_CONFLICT: &str = "TIME";
    /// Linked / co-requisite section conflict.
    pub const COREQUISITE: &str = "CORQ";
    /// Credit-limit exceeded.
    pub const MAX_CREDIT: &str = "MAXI";
    /// Extended-registration add marker.
    pub const EXTENDED_ADD: &str = "EX-ADD";
    /// Extended-registration drop marker.
    pub const EXTENDED_DROP: &str = "EX-DROP";
    /// Grade-mode change request marker.
    pub const GRADE_MODE: &str = "GMODE";
    /// Variable-credit change request marker.
    pub const VARIABLE_CREDIT: &str = "VARCR";
    /// Variable-title course request marker.
    pub const VARIABLE_TITLE: &str = "VARTL";
}

/// One problem reported by the SIS for a change line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeError {
    /// SIS error code (controlled vocabulary, see [`error_codes`]).
    pub code: String,
    /// Human-readable message from the SIS.
    pub message: String,
}

impl ChangeError {
    /// Create a new change error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The operation a change line performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOperation {
    /// Register the section.
    Add,
    /// Deregister the section.
    Drop,
    /// Leave the section as-is (no remote mutation).
    Keep,
    /// Change the grading mode of an enrolled course.
    ChangeGradeMode,
    /// Change the credit hours of a variable-credit course.
    ChangeCredit,
    /// Request an ad-hoc variable title course that does not exist in
    /// the catalog until approved.
    RequestVariableTitle,
}

/// One line item of a registration or override request.
///
/// Ordinary operations always reference one course; the synthetic
/// max-credit line attached to a credit-limit request references none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Course identity, absent only for the student-level max-credit line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseId>,
    /// Section identity, when the operation targets one section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crn: Option<Crn>,
    /// Operation performed by this line.
    pub operation: ChangeOperation,
    /// Problems the SIS reported (or a prior validation pass attached).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ChangeError>,
    /// Approval status, once the line has been submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Requestor note carried with this line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Credit hours this line contributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<f32>,
}

impl Change {
    /// Create a change for one section of a course.
    #[must_use]
    pub fn section(course: CourseId, crn: Crn, operation: ChangeOperation) -> Self {
        Self {
            course: Some(course),
            crn: Some(crn),
            operation,
            errors: Vec::new(),
            status: None,
            note: None,
            credit: None,
        }
    }

    /// Create a course-level change with no section (grade mode,
    /// variable credit, variable title).
    #[must_use]
    pub fn course_level(course: CourseId, operation: ChangeOperation) -> Self {
        Self {
            course: Some(course),
            crn: None,
            operation,
            errors: Vec::new(),
            status: None,
            note: None,
            credit: None,
        }
    }

    /// Create the synthetic student-level max-credit line.
    #[must_use]
    pub fn max_credit(credit: f32) -> Self {
        Self {
            course: None,
            crn: None,
            operation: ChangeOperation::Keep,
            errors: Vec::new(),
            status: None,
            note: None,
            credit: Some(credit),
        }
    }

    /// Attach a credit contribution.
    #[must_use]
    pub fn with_credit(mut self, credit: f32) -> Self {
        self.credit = Some(credit);
        self
    }

    /// Attach a requestor note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach an error.
    #[must_use]
    pub fn with_error(mut self, error: ChangeError) -> Self {
        self.errors.push(error);
        self
    }

    /// Whether this is the course-less student-level max-credit line.
    #[must_use]
    pub fn is_max_credit(&self) -> bool {
        self.course.is_none() && self.crn.is_none()
    }

    /// Whether any attached error carries the given code.
    #[must_use]
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Whether this line requires or received an override decision.
    #[must_use]
    pub fn needs_override(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_change() {
        let change = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Add,
        )
        .with_credit(3.0);
        assert_eq!(change.operation, ChangeOperation::Add);
        assert_eq!(change.credit, Some(3.0));
        assert!(!change.is_max_credit());
        assert!(!change.needs_override());
    }

    #[test]
    fn test_max_credit_change() {
        let change = Change::max_credit(19.0);
        assert!(change.is_max_credit());
        assert_eq!(change.credit, Some(19.0));
    }

    #[test]
    fn test_has_error() {
        let change = Change::section(
            CourseId::from("PHYS 172"),
            Crn::from("54321"),
            ChangeOperation::Add,
        )
        .with_error(ChangeError::new(error_codes::TIME_CONFLICT, "time conflict"));
        assert!(change.has_error(error_codes::TIME_CONFLICT));
        assert!(!change.has_error(error_codes::CLOSED));
        assert!(change.needs_override());
    }

    #[test]
    fn test_wire_shape_omits_empty_fields() {
        let change = Change::section(
            CourseId::from("MATH 101"),
            Crn::from("12345"),
            ChangeOperation::Keep,
        );
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["operation"], "keep");
        assert!(json.get("errors").is_none());
        assert!(json.get("status").is_none());
    }
}
