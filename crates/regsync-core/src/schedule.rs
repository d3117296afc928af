//! Desired schedules and current enrollment snapshots.
//!
//! The desired schedule is produced upstream (solver or interactive
//! request builder). The current enrollment is always fetched fresh from
//! the SIS before a synchronization attempt; the SIS is the source of
//! truth and snapshots are never cached across calls.

use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, Crn, StudentId};

/// One section the student wants within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredSection {
    /// Section identity.
    pub crn: Crn,
    /// Default credit contribution of this section.
    pub credit: f32,
}

/// One course the student wants, with the chosen sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredCourse {
    /// Course identity.
    pub course: CourseId,
    /// Chosen sections.
    pub sections: Vec<DesiredSection>,
    /// Course-level credit override; replaces the per-section defaults
    /// when set (variable-credit courses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_override: Option<f32>,
    /// Whether the student accepts a wait-list position for this course.
    #[serde(default)]
    pub wait_list: bool,
}

impl DesiredCourse {
    /// Total credit this course contributes to the desired schedule.
    #[must_use]
    pub fn credit(&self) -> f32 {
        self.credit_override
            .unwrap_or_else(|| self.sections.iter().map(|s| s.credit).sum())
    }
}

/// The schedule the student intends to hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredSchedule {
    /// Student the schedule belongs to.
    pub student_id: StudentId,
    /// Ordered set of desired courses.
    pub courses: Vec<DesiredCourse>,
    /// Credit ceiling currently granted to the student, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f32>,
}

impl DesiredSchedule {
    /// Total desired credit across all courses.
    #[must_use]
    pub fn total_credit(&self) -> f32 {
        self.courses.iter().map(DesiredCourse::credit).sum()
    }

    /// Whether any desired course accepts a wait-list position.
    #[must_use]
    pub fn has_wait_listed_courses(&self) -> bool {
        self.courses.iter().any(|c| c.wait_list)
    }

    /// All desired CRNs, in schedule order.
    pub fn crns(&self) -> impl Iterator<Item = &Crn> {
        self.courses.iter().flat_map(|c| c.sections.iter().map(|s| &s.crn))
    }
}

/// One line of the SIS's current registration record.
///
/// The capability flags are returned by the SIS per line; they describe
/// what the SIS will permit, not engine-side policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentLine {
    /// Section identity.
    pub crn: Crn,
    /// Course the section belongs to.
    pub course: CourseId,
    /// Credit hours of the section.
    pub credit: f32,
    /// Whether the student is currently registered in this section.
    pub registered: bool,
    /// Whether the SIS permits adding this section.
    #[serde(default = "default_true")]
    pub can_add: bool,
    /// Whether the SIS permits dropping this section.
    #[serde(default = "default_true")]
    pub can_drop: bool,
    /// Whether the line is a wait-list position rather than a seat.
    #[serde(default)]
    pub wait_listed: bool,
    /// Grading mode code, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_mode: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The SIS's current registration record for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentEnrollment {
    /// Student the record belongs to.
    pub student_id: StudentId,
    /// Per-section lines.
    pub lines: Vec<EnrollmentLine>,
    /// Credit ceiling the SIS reports for the student, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit: Option<f32>,
}

impl CurrentEnrollment {
    /// An empty record for a student with no registrations.
    #[must_use]
    pub fn empty(student_id: StudentId) -> Self {
        Self {
            student_id,
            lines: Vec::new(),
            max_credit: None,
        }
    }

    /// CRNs the student is currently registered in.
    pub fn registered_crns(&self) -> impl Iterator<Item = &Crn> {
        self.lines
            .iter()
            .filter(|l| l.registered)
            .map(|l| &l.crn)
    }

    /// Lines currently registered for the given course.
    pub fn registered_in_course<'a>(
        &'a self,
        course: &'a CourseId,
    ) -> impl Iterator<Item = &'a EnrollmentLine> {
        self.lines
            .iter()
            .filter(move |l| l.registered && &l.course == course)
    }

    /// Look up a line by CRN.
    #[must_use]
    pub fn line(&self, crn: &Crn) -> Option<&EnrollmentLine> {
        self.lines.iter().find(|l| &l.crn == crn)
    }

    /// Whether the student holds any registration at all.
    #[must_use]
    pub fn has_registrations(&self) -> bool {
        self.lines.iter().any(|l| l.registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(crn: &str, credit: f32) -> DesiredSection {
        DesiredSection {
            crn: Crn::from(crn),
            credit,
        }
    }

    #[test]
    fn test_course_credit_override_replaces_section_defaults() {
        let course = DesiredCourse {
            course: CourseId::from("CHEM 115"),
            sections: vec![section("1", 3.0), section("2", 1.0)],
            credit_override: None,
            wait_list: false,
        };
        assert!((course.credit() - 4.0).abs() < f32::EPSILON);

        let course = DesiredCourse {
            credit_override: Some(2.0),
            ..course
        };
        assert!((course.credit() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_total_credit() {
        let schedule = DesiredSchedule {
            student_id: StudentId::from("A1"),
            courses: vec![
                DesiredCourse {
                    course: CourseId::from("MATH 101"),
                    sections: vec![section("1", 3.0)],
                    credit_override: None,
                    wait_list: false,
                },
                DesiredCourse {
                    course: CourseId::from("PHYS 172"),
                    sections: vec![section("2", 4.0)],
                    credit_override: None,
                    wait_list: true,
                },
            ],
            credit_limit: Some(18.0),
        };
        assert!((schedule.total_credit() - 7.0).abs() < f32::EPSILON);
        assert!(schedule.has_wait_listed_courses());
    }

    #[test]
    fn test_enrollment_lookups() {
        let enrollment = CurrentEnrollment {
            student_id: StudentId::from("A1"),
            lines: vec![
                EnrollmentLine {
                    crn: Crn::from("1"),
                    course: CourseId::from("MATH 101"),
                    credit: 3.0,
                    registered: true,
                    can_add: true,
                    can_drop: false,
                    wait_listed: false,
                    grade_mode: None,
                },
                EnrollmentLine {
                    crn: Crn::from("2"),
                    course: CourseId::from("MATH 101"),
                    credit: 0.0,
                    registered: false,
                    can_add: true,
                    can_drop: true,
                    wait_listed: false,
                    grade_mode: None,
                },
            ],
            max_credit: Some(18.0),
        };
        assert_eq!(enrollment.registered_crns().count(), 1);
        assert_eq!(
            enrollment
                .registered_in_course(&CourseId::from("MATH 101"))
                .count(),
            1
        );
        assert!(enrollment.line(&Crn::from("2")).is_some());
        assert!(enrollment.has_registrations());
    }
}
