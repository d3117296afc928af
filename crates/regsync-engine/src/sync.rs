//! Real-time enrollment synchronization.
//!
//! Drives the immediate (non-approval) add/drop path: fetch the current
//! SIS enrollment fresh, diff it against the desired schedule, submit
//! the action list, and run the bounded auto-override loop against the
//! per-line errors the SIS reports.
//!
//! Per student, callers must serialize access: two concurrent
//! synchronizations for the same student race their writes to the SIS.
//! Cancelling the returned future aborts the override loop between
//! rounds; whatever was last acknowledged by the SIS remains the
//! authoritative state, and an unacknowledged submission must never be
//! assumed to have failed.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use regsync_core::change::error_codes;
use regsync_core::{
    CampusId, ChangeError, CourseId, Crn, CurrentEnrollment, DesiredSchedule, StudentId, TermId,
};
use regsync_sis::lookup::{DefaultClassLookup, ExternalClassLookup, ExternalTermResolver};
use regsync_sis::wire::{
    CheckRestrictionsRequest, CheckRestrictionsResponse, EnrollmentAction, EnrollmentActionKind,
    EnrollmentChangeRequest, EnrollmentResultResponse, RestrictionChanges, RestrictionProblem,
};
use regsync_sis::{SisClient, SisError};

use crate::changeset::{ChangeSet, ChangeSetBuilder, PriorError};
use crate::config::{ConditionalAddDropPolicy, EngineConfig};
use crate::error::{EngineError, EngineResult};

/// Error codes that are reported but never block a registration.
const INFORMATIONAL_CODES: [&str; 2] = [error_codes::EXTENDED_ADD, error_codes::EXTENDED_DROP];

/// One line the synchronization could not bring to the desired state.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentFailure {
    /// Course the line belongs to, when known.
    pub course: Option<CourseId>,
    /// Section the failure applies to.
    pub crn: Crn,
    /// Human-readable message.
    pub message: String,
    /// Whether the line is registered despite the failure.
    pub registered: bool,
    /// Structured errors reported by the SIS.
    pub errors: Vec<ChangeError>,
}

impl EnrollmentFailure {
    /// Whether every attached error is informational.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        !self.errors.is_empty()
            && self
                .errors
                .iter()
                .all(|e| INFORMATIONAL_CODES.contains(&e.code.as_str()))
    }
}

impl std::fmt::Display for EnrollmentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.course {
            Some(course) => write!(f, "{} (CRN {}): {}", course, self.crn, self.message),
            None => write!(f, "CRN {}: {}", self.crn, self.message),
        }
    }
}

/// The action list for one submission, with the failures already known
/// before any network write.
#[derive(Debug, Clone)]
struct SubmissionPlan {
    actions: Vec<EnrollmentAction>,
    failures: Vec<EnrollmentFailure>,
}

impl SubmissionPlan {
    fn has_mutations(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.operation != EnrollmentActionKind::Keep)
    }

    fn has_drops(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.operation == EnrollmentActionKind::Drop)
    }
}

/// Synchronizes a student's SIS registration with a desired schedule.
pub struct EnrollmentSynchronizer<C> {
    client: Arc<C>,
    config: EngineConfig,
    term: TermId,
    campus: CampusId,
    class_lookup: Arc<dyn ExternalClassLookup>,
}

impl<C: SisClient> EnrollmentSynchronizer<C> {
    /// Create a synchronizer for one term.
    #[must_use]
    pub fn new(client: Arc<C>, config: EngineConfig, term: TermId, campus: CampusId) -> Self {
        Self {
            client,
            config,
            term,
            campus,
            class_lookup: Arc::new(DefaultClassLookup::new()),
        }
    }

    /// Create a synchronizer by resolving an academic session through
    /// the institution's term resolver.
    pub async fn for_session(
        client: Arc<C>,
        config: EngineConfig,
        resolver: &dyn ExternalTermResolver,
        session: &str,
    ) -> EngineResult<Self> {
        let (term, campus) = resolver.resolve(session).await?;
        Ok(Self::new(client, config, term, campus))
    }

    /// Use a class lookup to resolve the course of CRNs the engine has
    /// no local knowledge of (co-requisite problems, stray SIS lines).
    #[must_use]
    pub fn with_class_lookup(mut self, lookup: Arc<dyn ExternalClassLookup>) -> Self {
        self.class_lookup = lookup;
        self
    }

    /// Pre-flight the desired schedule against the SIS restriction
    /// check, without applying anything.
    #[instrument(skip(self, desired), fields(student_id = %desired.student_id))]
    pub async fn check_restrictions(
        &self,
        desired: &DesiredSchedule,
    ) -> EngineResult<Vec<RestrictionProblem>> {
        let enrollment = self.fetch_current(&desired.student_id).await?;
        let set = ChangeSetBuilder::new(desired, &enrollment).build();
        let response = self.run_restriction_check(desired, &set).await?;
        Ok(response.problems)
    }

    /// Diff the desired schedule and fold the SIS restriction check's
    /// findings back onto the change lines, ready for the approval
    /// path.
    ///
    /// Problems are attached to matching lines by CRN, then by course;
    /// the SIS's max-credit calculation feeds the credit check.
    #[instrument(skip(self, desired), fields(student_id = %desired.student_id))]
    pub async fn diff_with_restrictions(
        &self,
        desired: &DesiredSchedule,
    ) -> EngineResult<ChangeSet> {
        let enrollment = self.fetch_current(&desired.student_id).await?;
        let set = ChangeSetBuilder::new(desired, &enrollment).build();
        let response = self.run_restriction_check(desired, &set).await?;

        let mut priors = Vec::with_capacity(response.problems.len());
        for problem in &response.problems {
            let course = match &problem.crn {
                Some(crn) => self.course_for(crn).await,
                None => None,
            };
            priors.push(PriorError {
                crn: problem.crn.clone(),
                course,
                error: problem.to_change_error(),
            });
        }

        let mut builder = ChangeSetBuilder::new(desired, &enrollment).with_prior_errors(priors);
        if let Some(max_credit) = response.max_credit {
            builder = builder.with_external_credit(max_credit);
        }
        if let Some(note) = &self.config.max_credit_note {
            builder = builder.with_max_credit_note(note.clone());
        }
        Ok(builder.build())
    }

    async fn run_restriction_check(
        &self,
        desired: &DesiredSchedule,
        set: &ChangeSet,
    ) -> EngineResult<CheckRestrictionsResponse> {
        let request = CheckRestrictionsRequest {
            student_id: desired.student_id.clone(),
            term: self.term.clone(),
            campus: self.campus.clone(),
            mode: "REG".to_string(),
            changes: RestrictionChanges {
                add: set.adds().cloned().collect(),
                drop: set.drops().cloned().collect(),
            },
        };
        Ok(self.client.check_restrictions(&request).await?)
    }

    /// Best-effort course resolution for a CRN; lookup failures leave
    /// the course unknown rather than failing the operation.
    async fn course_for(&self, crn: &Crn) -> Option<CourseId> {
        match self.class_lookup.course_for_crn(&self.term, crn).await {
            Ok(course) => course,
            Err(error) => {
                debug!(crn = %crn, error = %error, "class lookup failed");
                None
            }
        }
    }

    /// Bring the student's registration in line with the desired
    /// schedule.
    ///
    /// Returns the per-line failures; success is not "no failures" but
    /// "every desired line ends up registered". The whole operation is
    /// raised as [`EngineError::EnrollmentRejected`] only when the
    /// registration set is left unchanged and at least one line failed,
    /// unless the schedule contains wait-listed courses (wait-list
    /// semantics expect later reconciliation).
    #[instrument(skip(self, desired), fields(student_id = %desired.student_id))]
    pub async fn synchronize(
        &self,
        desired: &DesiredSchedule,
    ) -> EngineResult<Vec<EnrollmentFailure>> {
        // Always a fresh read; the SIS is the source of truth.
        let enrollment = self.fetch_current(&desired.student_id).await?;
        let before: HashSet<Crn> = enrollment.registered_crns().cloned().collect();

        let plan = build_plan(desired, &enrollment);
        if !plan.has_mutations() {
            debug!("nothing to submit, skipping remote write");
            if !plan.failures.is_empty() && !desired.has_wait_listed_courses() {
                return Err(EngineError::EnrollmentRejected {
                    failures: plan.failures,
                });
            }
            return Ok(plan.failures);
        }

        let conditional = match self.config.conditional_add_drop {
            ConditionalAddDropPolicy::Never => false,
            ConditionalAddDropPolicy::Always => true,
            ConditionalAddDropPolicy::WhenNeeded => {
                plan.has_drops() || enrollment.has_registrations()
            }
        };

        let request = EnrollmentChangeRequest {
            student_id: desired.student_id.clone(),
            term: self.term.clone(),
            campus: self.campus.clone(),
            actions: plan.actions.clone(),
            conditional_add_drop: conditional,
        };

        let response = self.submit_with_overrides(request).await?;

        let mut failures = plan.failures;
        failures.extend(collect_failures(desired, &enrollment, &response));

        let after = registered_after(&before, &response);
        append_unregistered_desired(desired, &after, &mut failures);
        for failure in &mut failures {
            if failure.course.is_none() {
                failure.course = self.course_for(&failure.crn).await;
            }
        }

        let blocking = failures.iter().any(|f| !f.is_informational());
        if after == before && blocking && !desired.has_wait_listed_courses() {
            // The caller gets nothing it did not already have.
            return Err(EngineError::EnrollmentRejected { failures });
        }

        info!(
            added = after.difference(&before).count(),
            dropped = before.difference(&after).count(),
            failures = failures.len(),
            "synchronization complete"
        );
        Ok(failures)
    }

    async fn fetch_current(&self, student_id: &StudentId) -> EngineResult<CurrentEnrollment> {
        let response = self.client.fetch_enrollment(student_id).await?;
        Ok(CurrentEnrollment {
            student_id: response.student_id,
            lines: response.lines,
            max_credit: response.max_credit,
        })
    }

    /// Submit, then run the bounded auto-override loop: each round maps
    /// per-line error codes to candidate override codes and resubmits
    /// with them attached. The loop only ever adds overrides, so it
    /// reaches a fixed point within the size of the mapping table.
    async fn submit_with_overrides(
        &self,
        mut request: EnrollmentChangeRequest,
    ) -> EngineResult<EnrollmentResultResponse> {
        let mut response = self.submit_once(&request).await?;

        if !self.config.auto_override_enabled {
            return Ok(response);
        }

        let max_rounds = self
            .config
            .max_override_rounds
            .min(self.config.override_table_size().max(1));
        for round in 0..max_rounds {
            match apply_override_round(&request, &response, &self.config) {
                None => break,
                Some(next) => {
                    debug!(round, "resubmitting with additional overrides");
                    request = next;
                    response = self.submit_once(&request).await?;
                }
            }
        }
        Ok(response)
    }

    async fn submit_once(
        &self,
        request: &EnrollmentChangeRequest,
    ) -> EngineResult<EnrollmentResultResponse> {
        let response = self.client.submit_enrollment(request).await?;
        if let Some(exception) = &response.exception {
            warn!(exception = %exception, "registration-wide exception");
            return Err(EngineError::Sis(SisError::envelope(exception.clone())));
        }
        Ok(response)
    }
}

/// Classify every line and build the action list. Capability flags come
/// from the SIS per line, not from engine-side policy.
fn build_plan(desired: &DesiredSchedule, enrollment: &CurrentEnrollment) -> SubmissionPlan {
    let mut actions = Vec::new();
    let mut failures = Vec::new();
    let desired_crns: HashSet<&Crn> = desired.crns().collect();

    for course in &desired.courses {
        for section in &course.sections {
            match enrollment.line(&section.crn) {
                Some(line) if line.registered => {
                    actions.push(EnrollmentAction::new(
                        EnrollmentActionKind::Keep,
                        section.crn.clone(),
                    ));
                }
                Some(line) if !line.can_add => {
                    failures.push(EnrollmentFailure {
                        course: Some(course.course.clone()),
                        crn: section.crn.clone(),
                        message: "the SIS does not permit adding this section".to_string(),
                        registered: false,
                        errors: Vec::new(),
                    });
                }
                _ => {
                    actions.push(EnrollmentAction::new(
                        EnrollmentActionKind::Add,
                        section.crn.clone(),
                    ));
                }
            }
        }
    }

    for line in enrollment.lines.iter().filter(|l| l.registered) {
        if desired_crns.contains(&line.crn) {
            continue;
        }
        if line.can_drop {
            actions.push(EnrollmentAction::new(
                EnrollmentActionKind::Drop,
                line.crn.clone(),
            ));
        } else {
            // Force a keep so the section is not silently lost.
            actions.push(EnrollmentAction::new(
                EnrollmentActionKind::Keep,
                line.crn.clone(),
            ));
            failures.push(EnrollmentFailure {
                course: Some(line.course.clone()),
                crn: line.crn.clone(),
                message: "the SIS does not permit dropping this section".to_string(),
                registered: true,
                errors: Vec::new(),
            });
        }
    }

    SubmissionPlan { actions, failures }
}

/// One round of the auto-override loop, as a pure function: attach an
/// override for every mappable, allowed error code. Returns `None` when
/// the round would change nothing (fixed point reached).
fn apply_override_round(
    request: &EnrollmentChangeRequest,
    response: &EnrollmentResultResponse,
    config: &EngineConfig,
) -> Option<EnrollmentChangeRequest> {
    let mut next = request.clone();
    let mut changed = false;

    for line in &response.lines {
        for error in &line.errors {
            let Some(override_code) = config.override_for(&error.code) else {
                continue;
            };
            let Some(action) = next.actions.iter_mut().find(|a| a.crn == line.crn) else {
                continue;
            };
            if !action
                .overrides
                .iter()
                .any(|o| o.as_str() == override_code)
            {
                action.overrides.push(override_code.to_string());
                changed = true;
            }
        }
    }

    changed.then_some(next)
}

/// Fold the final response into caller-visible failures.
fn collect_failures(
    desired: &DesiredSchedule,
    enrollment: &CurrentEnrollment,
    response: &EnrollmentResultResponse,
) -> Vec<EnrollmentFailure> {
    let mut failures = Vec::new();
    for line in &response.lines {
        if line.errors.is_empty() && line.registered {
            continue;
        }
        if line.errors.is_empty() {
            // Unregistered without errors: either a drop that worked or
            // a silently missed add; the desired-line check reports the
            // latter.
            continue;
        }
        let course = desired
            .courses
            .iter()
            .find(|c| c.sections.iter().any(|s| s.crn == line.crn))
            .map(|c| c.course.clone())
            .or_else(|| enrollment.line(&line.crn).map(|l| l.course.clone()));
        let message = line
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        failures.push(EnrollmentFailure {
            course,
            crn: line.crn.clone(),
            message,
            registered: line.registered,
            errors: line.errors.clone(),
        });
    }
    failures
}

/// Success means every desired line ends up registered, not "no per-line
/// errors": a desired section the SIS left unregistered is a failure
/// even when the response carried no error for it. Wait-listed courses
/// are exempt; their registration resolves later.
fn append_unregistered_desired(
    desired: &DesiredSchedule,
    registered: &HashSet<Crn>,
    failures: &mut Vec<EnrollmentFailure>,
) {
    for course in desired.courses.iter().filter(|c| !c.wait_list) {
        for section in &course.sections {
            if registered.contains(&section.crn) {
                continue;
            }
            if failures.iter().any(|f| f.crn == section.crn) {
                continue;
            }
            failures.push(EnrollmentFailure {
                course: Some(course.course.clone()),
                crn: section.crn.clone(),
                message: "the SIS did not register this section".to_string(),
                registered: false,
                errors: Vec::new(),
            });
        }
    }
}

/// The registration set after the submission, derived from the response
/// lines; CRNs the response does not mention keep their previous state.
fn registered_after(before: &HashSet<Crn>, response: &EnrollmentResultResponse) -> HashSet<Crn> {
    let mut after = before.clone();
    for line in &response.lines {
        if line.registered {
            after.insert(line.crn.clone());
        } else {
            after.remove(&line.crn);
        }
    }
    after
}
