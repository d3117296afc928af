//! Change-set builder.
//!
//! Pure diff between the desired schedule and the current SIS
//! enrollment. The builder is deterministic and side-effect-free: the
//! same (desired, current) pair always yields the same change-set.

use std::collections::HashSet;

use regsync_core::change::error_codes;
use regsync_core::{
    Change, ChangeError, ChangeOperation, CourseId, Crn, CurrentEnrollment, DesiredSchedule,
    OverrideRequest, StudentId,
};

/// A validation error from a prior pass, to be folded back onto the
/// matching change line.
#[derive(Debug, Clone)]
pub struct PriorError {
    /// Section the error was reported for, when known.
    pub crn: Option<Crn>,
    /// Course the error was reported for, when known.
    pub course: Option<CourseId>,
    /// The error itself.
    pub error: ChangeError,
}

/// Result of one diff: the change lines plus the credit calculation.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Ordered change lines.
    pub changes: Vec<Change>,
    /// Total credit of the desired schedule (or the externally supplied
    /// figure, whichever is larger).
    pub max_credit: f32,
    /// Whether the request must carry a student-level max-credit
    /// override.
    pub max_credit_requested: bool,
}

impl ChangeSet {
    /// Whether the diff found nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.operation == ChangeOperation::Keep && c.errors.is_empty())
    }

    /// CRNs to add, in order.
    pub fn adds(&self) -> impl Iterator<Item = &Crn> {
        self.changes
            .iter()
            .filter(|c| c.operation == ChangeOperation::Add)
            .filter_map(|c| c.crn.as_ref())
    }

    /// CRNs to drop, in order.
    pub fn drops(&self) -> impl Iterator<Item = &Crn> {
        self.changes
            .iter()
            .filter(|c| c.operation == ChangeOperation::Drop)
            .filter_map(|c| c.crn.as_ref())
    }

    /// Assemble an override request from this change-set.
    #[must_use]
    pub fn into_request(self, student_id: StudentId) -> OverrideRequest {
        let max_credit = self.max_credit_requested.then_some(self.max_credit);
        let mut request = OverrideRequest::new(student_id, self.changes);
        if let Some(max_credit) = max_credit {
            request = request.with_max_credit(max_credit);
        }
        request
    }
}

/// Builder for one diff.
#[derive(Debug)]
pub struct ChangeSetBuilder<'a> {
    desired: &'a DesiredSchedule,
    current: &'a CurrentEnrollment,
    prior_errors: Vec<PriorError>,
    external_credit: Option<f32>,
    max_credit_note: Option<String>,
}

impl<'a> ChangeSetBuilder<'a> {
    /// Start a diff of `desired` against `current`.
    #[must_use]
    pub fn new(desired: &'a DesiredSchedule, current: &'a CurrentEnrollment) -> Self {
        Self {
            desired,
            current,
            prior_errors: Vec::new(),
            external_credit: None,
            max_credit_note: None,
        }
    }

    /// Fold errors from a prior validation pass onto the change lines.
    #[must_use]
    pub fn with_prior_errors(mut self, errors: Vec<PriorError>) -> Self {
        self.prior_errors = errors;
        self
    }

    /// Consider an externally supplied credit figure in the max-credit
    /// calculation.
    #[must_use]
    pub fn with_external_credit(mut self, credit: f32) -> Self {
        self.external_credit = Some(credit);
        self
    }

    /// Requestor note to attach to the max-credit line, when one is
    /// emitted.
    #[must_use]
    pub fn with_max_credit_note(mut self, note: impl Into<String>) -> Self {
        self.max_credit_note = Some(note.into());
        self
    }

    /// Run the diff.
    #[must_use]
    pub fn build(self) -> ChangeSet {
        let mut changes = Vec::new();
        let mut desired_courses: HashSet<&CourseId> = HashSet::new();

        // Courses the student wants: symmetric difference per course.
        for course in &self.desired.courses {
            desired_courses.insert(&course.course);
            let enrolled: HashSet<&Crn> = self
                .current
                .registered_in_course(&course.course)
                .map(|l| &l.crn)
                .collect();
            let wanted: HashSet<&Crn> = course.sections.iter().map(|s| &s.crn).collect();

            let mut first_add = true;
            for section in &course.sections {
                if !enrolled.contains(&section.crn) {
                    // Course-level credit override replaces the
                    // per-subpart default, on the first subpart only.
                    let credit = match course.credit_override {
                        Some(override_credit) if first_add => override_credit,
                        Some(_) => 0.0,
                        None => section.credit,
                    };
                    first_add = false;
                    changes.push(
                        Change::section(
                            course.course.clone(),
                            section.crn.clone(),
                            ChangeOperation::Add,
                        )
                        .with_credit(credit),
                    );
                }
            }
            for line in self.current.registered_in_course(&course.course) {
                if !wanted.contains(&line.crn) {
                    changes.push(Change::section(
                        course.course.clone(),
                        line.crn.clone(),
                        ChangeOperation::Drop,
                    ));
                }
            }
        }

        // Courses the student no longer wants at all: drop every
        // registered section.
        for line in self.current.lines.iter().filter(|l| l.registered) {
            if !desired_courses.contains(&line.course) {
                changes.push(Change::section(
                    line.course.clone(),
                    line.crn.clone(),
                    ChangeOperation::Drop,
                ));
            }
        }

        // Fold prior validation errors back onto matching lines.
        let mut has_max_credit_error = false;
        for prior in self.prior_errors {
            if prior.error.code == error_codes::MAX_CREDIT {
                has_max_credit_error = true;
            }
            let matched = changes
                .iter()
                .position(|c| prior.crn.is_some() && c.crn == prior.crn)
                .or_else(|| {
                    changes
                        .iter()
                        .position(|c| prior.course.is_some() && c.course == prior.course)
                });
            match matched {
                Some(index) => changes[index].errors.push(prior.error),
                None => {
                    // The error matches no change line; keep it on a
                    // synthetic line so it is not lost.
                    changes.push(Change {
                        course: prior.course,
                        crn: prior.crn,
                        operation: ChangeOperation::Keep,
                        errors: vec![prior.error],
                        status: None,
                        note: None,
                        credit: None,
                    });
                }
            }
        }

        // Credit calculation over the desired schedule.
        let total = self.desired.total_credit();
        let max_credit = match self.external_credit {
            Some(external) if external > total => external,
            _ => total,
        };
        let limit = self
            .desired
            .credit_limit
            .or(self.current.max_credit);
        let over_limit = limit.is_some_and(|l| max_credit > l);
        let max_credit_requested = over_limit || has_max_credit_error;

        if max_credit_requested {
            let mut line = Change::max_credit(max_credit).with_error(ChangeError::new(
                error_codes::MAX_CREDIT,
                format!("Credit limit increase to {max_credit} requested"),
            ));
            if let Some(note) = self.max_credit_note {
                line = line.with_note(note);
            }
            changes.push(line);
        }

        ChangeSet {
            changes,
            max_credit,
            max_credit_requested,
        }
    }
}
